//! Parameter, property and error-code names shared with the host framework.

// Connection pool parameters
pub const MAX_ACTIVE_CONNECTIONS: &str = "maxActiveConnections";
pub const MAX_IDLE_CONNECTIONS: &str = "maxIdleConnections";
pub const MAX_WAIT_TIME: &str = "maxWaitTime";
pub const MAX_EVICTION_TIME: &str = "minEvictionTime";
pub const EVICTION_CHECK_INTERVAL: &str = "evictionCheckInterval";
pub const EXHAUSTED_ACTION: &str = "exhaustedAction";

// Response model parameters
pub const RESPONSE_VARIABLE: &str = "responseVariable";
pub const OVERWRITE_BODY: &str = "overwriteBody";

// Connection parameters
pub const CONNECTION_NAME: &str = "name";
pub const BASE: &str = "base";
pub const REFRESH_TOKEN: &str = "refreshToken";
pub const CLIENT_ID: &str = "clientId";
pub const CLIENT_SECRET: &str = "clientSecret";
pub const TOKEN_ENDPOINT: &str = "tokenEndpoint";

// Properties written back to the message
pub const PROPERTY_BASE: &str = "uri.var.base";
pub const PROPERTY_ACCESS_TOKEN: &str = "_ACTIVE_ACCESS_TOKEN_";
pub const PROPERTY_ERROR_CODE: &str = "ERROR_CODE";
pub const PROPERTY_ERROR_MESSAGE: &str = "ERROR_MESSAGE";

pub const GENERAL_ERROR_MSG: &str = "Connector encountered an error: ";

/// Stable machine-readable error codes.
pub mod error_codes {
    pub const GENERAL_ERROR: &str = "701001";
    pub const INVALID_CONFIG: &str = "701002";
    pub const TOKEN_ERROR: &str = "701003";
    pub const CONNECTION_ERROR: &str = "701004";
}

/// OAuth2 form and response field names.
pub mod oauth2 {
    pub const GRANT_TYPE: &str = "grant_type";
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const EXPIRES_IN: &str = "expires_in";
}
