use jsonwebtoken::TokenData;
use uuid::Uuid;
use crate::{entities::token::Claims, errors::AuthError};

pub trait TokenServiceRepository: Send + Sync {
    /// Creates a new access JWT for an identity
    fn create_jwt(&self, user_id: &Uuid, admin: bool) -> Result<String, AuthError>;

    /// Decodes a JWT and returns the claims
    fn decode_jwt(&self, token: &str) -> Result<TokenData<Claims>, AuthError>;
}
