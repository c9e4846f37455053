//! Analytics service error codes used for classification.
//!
//! Codes follow the analytics service's documented ranges: 20xxx
//! authentication, 21xxx request handling, 23xxx service state, 24xxx
//! compilation, 25xxx internal.

/// Request timed out on the server and will be cancelled.
pub const REQUEST_TIMED_OUT: u32 = 21002;
/// Analytics service is temporarily unavailable.
pub const SERVICE_UNAVAILABLE: u32 = 23000;
/// Operation cannot be performed during a rebalance.
pub const REBALANCE_IN_PROGRESS: u32 = 23003;
/// Job queue is full.
pub const JOB_QUEUE_FULL: u32 = 23007;

/// Syntax error in the statement.
pub const PARSING_FAILURE: u32 = 24000;
/// Link does not exist.
pub const LINK_NOT_FOUND: u32 = 24006;
/// Dataset does not exist.
pub const DATASET_NOT_FOUND: u32 = 24025;
/// Dataverse does not exist.
pub const DATAVERSE_NOT_FOUND: u32 = 24034;
/// Dataverse already exists.
pub const DATAVERSE_EXISTS: u32 = 24039;
/// Dataset already exists.
pub const DATASET_EXISTS: u32 = 24040;
/// Cannot find dataset with name in dataverse.
pub const DATASET_NOT_FOUND_IN_DATAVERSE: u32 = 24044;
/// Cannot find dataset in the current dataverse.
pub const DATASET_NOT_FOUND_IN_SCOPE: u32 = 24045;
/// Index does not exist.
pub const INDEX_NOT_FOUND: u32 = 24047;
/// Index already exists.
pub const INDEX_EXISTS: u32 = 24048;

/// Codes treated as transient and returned as retryable results.
pub const RETRYABLE: [u32; 3] = [REQUEST_TIMED_OUT, SERVICE_UNAVAILABLE, REBALANCE_IN_PROGRESS];

/// Codes that name a dataset-not-found condition.
pub const DATASET_NOT_FOUND_CODES: [u32; 3] = [
    DATASET_NOT_FOUND,
    DATASET_NOT_FOUND_IN_DATAVERSE,
    DATASET_NOT_FOUND_IN_SCOPE,
];

/// Authentication failures.
pub const AUTHENTICATION_RANGE: std::ops::Range<u32> = 20000..21000;
/// Service-state failures.
pub const SERVICE_STATE_RANGE: std::ops::Range<u32> = 23000..24000;
/// Compilation failures.
pub const COMPILATION_RANGE: std::ops::Range<u32> = 24000..25000;
/// Internal server failures.
pub const INTERNAL_RANGE: std::ops::Range<u32> = 25000..26000;
