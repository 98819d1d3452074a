//! Environment variable source: TREESYNC prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add the environment overlay, e.g. `TREESYNC__BROWSER__CACHE_TTL_MS=60000`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("TREESYNC")
            .separator("__")
            .try_parsing(true),
    )
}
