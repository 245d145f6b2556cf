// Error codes returned to API clients.
// Codes are stable: clients match on them, so never renumber.

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
}

pub mod authentication {
    pub const INVALID_CREDENTIALS: &str = "AUTH_2001";
    pub const TOKEN_EXPIRED: &str = "AUTH_2002";
}

pub mod authorization {
    pub const ACCESS_DENIED: &str = "AUTHZ_3001";
    pub const INSUFFICIENT_PERMISSIONS: &str = "AUTHZ_3002";
}

pub mod resource {
    pub const NOT_FOUND: &str = "RESOURCE_4001";
    pub const DUPLICATE: &str = "RESOURCE_4002";
}

pub mod claims {
    pub const REFERRAL_NOT_APPROVED: &str = "CLAIMS_5001";
    pub const UTN_NOT_VALIDATED: &str = "CLAIMS_5002";
    pub const UTN_INVALID: &str = "CLAIMS_5003";
    pub const PA_CODE_NOT_APPROVED: &str = "CLAIMS_5004";
    pub const PA_CODE_EXPIRED: &str = "CLAIMS_5005";
    pub const INVALID_STATUS_TRANSITION: &str = "CLAIMS_5006";
    pub const FACILITY_MISMATCH: &str = "CLAIMS_5007";
    pub const AMOUNT_EXCEEDED: &str = "CLAIMS_5008";
    pub const ADMISSION_NOT_DISCHARGED: &str = "CLAIMS_5009";
}

pub mod enrollment {
    pub const ENROLLEE_NOT_ELIGIBLE: &str = "ENROLLMENT_6001";
    pub const PIN_UNAVAILABLE: &str = "ENROLLMENT_6002";
    pub const PIN_EXPIRED: &str = "ENROLLMENT_6003";
    pub const FACILITY_INACTIVE: &str = "ENROLLMENT_6004";
}

pub mod system {
    pub const RATE_LIMITED: &str = "SYSTEM_9001";
    pub const CONFIGURATION: &str = "SYSTEM_9002";
    pub const INTERNAL: &str = "SYSTEM_9003";
}
