//! Well-known document keys and constants shared by reports, desires and views.

/// Maximum nesting level a merge may descend to.
pub const MAX_JSON_LEVEL: usize = 5;

pub const KEY_SYNC_MODE: &str = "syncMode";
pub const KEY_NODE_PROPS: &str = "nodeprops";
pub const KEY_DEVICES: &str = "devices";
pub const KEY_APPS: &str = "apps";
pub const KEY_SYS_APPS: &str = "sysapps";
pub const KEY_APP_STATS: &str = "appstats";
pub const KEY_SYS_APP_STATS: &str = "sysappstats";
pub const KEY_ACCELERATOR: &str = "accelerator";
pub const KEY_CLUSTER: &str = "cluster";
pub const KEY_OPTIONAL_SYS_APPS: &str = "optionalSysApps";
pub const KEY_NODE: &str = "node";
pub const KEY_NODE_STATS: &str = "nodestats";
pub const KEY_TIME: &str = "time";

/// Node property keys understood by the edge core.
pub const PROP_CORE_FREQUENCY: &str = "BaetylCoreFrequency";
pub const PROP_CORE_API_PORT: &str = "BaetylCoreAPIPort";

/// Accelerator kind whose extension map carries GPU counters.
pub const NV_ACCELERATOR: &str = "nvidia";

pub const RESOURCE_CPU: &str = "cpu";
pub const RESOURCE_MEMORY: &str = "memory";
pub const RESOURCE_GPU: &str = "gpu";

pub const KEY_GPU_USED_MEMORY: &str = "usedMemory";
pub const KEY_GPU_TOTAL_MEMORY: &str = "totalMemory";
pub const KEY_GPU_PERCENT: &str = "percent";

/// Role assigned to a sub-node recovered from the pre-cluster report format.
pub const ROLE_MASTER: &str = "master";
