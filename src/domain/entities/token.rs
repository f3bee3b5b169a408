use serde::{Serialize, Deserialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// External identity the profile is attached to.
    pub sub: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
    pub iat: usize,
}
