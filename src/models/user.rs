//! User directory record and JWT claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::Rights;
use crate::error::AppError;

/// User known to the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
}

/// User rights structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRights {
    #[serde(default)]
    pub equipment_rights: Rights,
    #[serde(default)]
    pub assignments_rights: Rights,
}

/// JWT Claims issued by the authentication service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub rights: UserRights,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    // Authorization checks
    pub fn require_read_equipment(&self) -> Result<(), AppError> {
        if self.rights.equipment_rights >= Rights::Read {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to read equipment".to_string()))
        }
    }

    pub fn require_read_assignments(&self) -> Result<(), AppError> {
        if self.rights.assignments_rights >= Rights::Read {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to read assignments".to_string()))
        }
    }

    pub fn require_write_assignments(&self) -> Result<(), AppError> {
        if self.rights.assignments_rights >= Rights::Write {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to manage assignments".to_string()))
        }
    }
}
