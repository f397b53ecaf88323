use std::path::Path;

use deferred_ngin::{config::Settings, flow::run};

fn main() -> anyhow::Result<()> {
    let settings = Settings::load_or_default(Path::new(Settings::FILE_NAME));
    run(settings)
}
