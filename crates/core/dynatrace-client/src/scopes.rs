//! OAuth scopes requested per operation.
//!
//! Platform tokens carry their scopes already; these lists only matter for
//! the OAuth client-credentials flow.

/// Scopes every operation needs.
pub const BASE: &[&str] = &["app-engine:apps:run", "app-engine:functions:run"];

pub const ENVIRONMENT_INFO: &[&str] = BASE;

pub const PROBLEMS: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "environment-api:problems:read",
];

pub const SECURITY_PROBLEMS: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "environment-api:security-problems:read",
];

pub const ENTITIES: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "environment-api:entities:read",
];

pub const FIND_ENTITY: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "environment-api:entities:read",
    "storage:entities:read",
];

pub const LOGS: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "storage:logs:read",
];

pub const EVENTS: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "storage:events:read",
];

pub const VERIFY_DQL: &[&str] = BASE;

/// Grail read scopes for arbitrary DQL.
pub const EXECUTE_DQL: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "storage:buckets:read",
    "storage:logs:read",
    "storage:metrics:read",
    "storage:bizevents:read",
    "storage:spans:read",
    "storage:entities:read",
    "storage:events:read",
    "storage:system:read",
    "storage:user.events:read",
    "storage:user.sessions:read",
    "storage:security.events:read",
];

pub const OWNERSHIP: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "environment-api:entities:read",
    "settings:objects:read",
];

pub const SLACK: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "app-settings:objects:read",
];

pub const WORKFLOWS: &[&str] = &[
    "app-engine:apps:run",
    "app-engine:functions:run",
    "automation:workflows:write",
    "automation:workflows:read",
    "automation:workflows:run",
];
