pub const HEADER_ALGORITHM: &str = "alg";
pub const HEADER_KEY_ID: &str = "kid";
pub const HEADER_JWKS_URL: &str = "jku";
pub const HEADER_TYPE: &str = "typ";

pub const ISSUER: &str = "iss";
pub const SUBJECT: &str = "sub";
pub const AUDIENCE: &str = "aud";
pub const EXPIRATION: &str = "exp";
pub const NOT_BEFORE: &str = "nbf";
pub const ISSUED_AT: &str = "iat";
pub const JWT_ID: &str = "jti";

pub const AUTHORIZED_PARTY: &str = "azp";
pub const XSUAA_CLIENT_ID: &str = "cid";
pub const XSUAA_ZONE_ID: &str = "zid";
pub const XSUAA_SCOPES: &str = "scope";
pub const IAS_ZONE_UUID: &str = "zone_uuid";
pub const IAS_APP_TENANT_ID: &str = "app_tid";
