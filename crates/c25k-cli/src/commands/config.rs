use clap::Subcommand;
use c25k_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "audio.speech", "remote.base_url")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let listing = dotted_listing(&config)?;
            print!("{listing}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

fn dotted_listing(config: &Config) -> Result<String, serde_json::Error> {
    let json = serde_json::to_value(config)?;
    let mut out = String::new();
    if let Some(sections) = json.as_object() {
        for (section, values) in sections {
            let Some(values) = values.as_object() else { continue };
            for (key, value) in values {
                out.push_str(&format!("{section}.{key} = {value}\n"));
            }
        }
    }
    Ok(out)
}
