//! Protocol and parameter constants

/// Default registry port when none (or 0) is configured
pub const DEFAULT_PORT: u16 = 4234;

/// Default listen backlog for the provider socket
pub const DEFAULT_BACKLOG: u32 = 50;

/// Longest line accepted from the peer, newline excluded
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

// Wire verbs
pub const REGISTER: &str = "register";
pub const UNREGISTER: &str = "unregister";
pub const SUBSCRIBE: &str = "subscribe";
pub const UNSUBSCRIBE: &str = "unsubscribe";

/// Wildcard value for interface, group, version, category and friends
pub const ANY_VALUE: &str = "*";

/// Host that means "bind everywhere"; never a valid registry address
pub const ANYHOST_VALUE: &str = "0.0.0.0";

// Parameter keys
pub const ANYHOST_KEY: &str = "anyhost";
pub const ROLE_KEY: &str = "role";
pub const TIMEOUT_KEY: &str = "timeout";
pub const BACKLOG_KEY: &str = "backlog";
pub const DYNAMIC_KEY: &str = "dynamic";
pub const REGISTER_KEY: &str = "register";
pub const INTERFACE_KEY: &str = "interface";
pub const CATEGORY_KEY: &str = "category";
pub const ENABLED_KEY: &str = "enabled";
pub const GROUP_KEY: &str = "group";
pub const VERSION_KEY: &str = "version";
pub const CLASSIFIER_KEY: &str = "classifier";

/// `role` value that selects the provider (listening) side
pub const SERVER_ROLE: &str = "server";

/// Category assumed when an endpoint has none
pub const DEFAULT_CATEGORY: &str = "providers";

/// Prefix marking an excluded entry in a category list (`-routers`)
pub const REMOVE_VALUE_PREFIX: char = '-';

// Descriptor protocols that never describe a live provider
pub const CONSUMER_PROTOCOL: &str = "consumer";
pub const ROUTE_PROTOCOL: &str = "route";
pub const OVERRIDE_PROTOCOL: &str = "override";
