//! Default values for every recognised option.
//!
//! | option              | default            |
//! |---------------------|--------------------|
//! | `watchOptions.aggregateTimeout` | `100` ms |
//! | `watchOptions.poll` | unset (native events) |
//! | `watchOptions.ignored` | empty           |
//! | `heartbeat`         | `10000` ms         |
//! | `hmrPath`           | `/__webpack_hmr`   |
//! | `lazy`              | `false`            |
//! | `filename`          | unset (all paths)  |
//! | `index`             | `index.html`       |
//! | `headers`           | empty              |
//! | `mimeTypes`         | empty (built-in table only) |
//! | `serverSideRender`  | `false`            |
//! | `statsOptions`      | `null`             |

pub const DEFAULT_INDEX: &str = "index.html";

pub fn default_aggregate_timeout() -> u64 {
    100
}

pub fn default_heartbeat() -> u64 {
    10 * 1000
}

pub fn default_hmr_path() -> String {
    "/__webpack_hmr".to_string()
}
