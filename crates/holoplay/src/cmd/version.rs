use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    default_url: &'static str,
    subprotocol: &'static str,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("holoplay {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let out = VersionOutput {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        target: option_env!("HOLOPLAY_BUILD_TARGET").unwrap_or("unknown"),
        profile: option_env!("HOLOPLAY_BUILD_PROFILE").unwrap_or("unknown"),
        default_url: holoplay_transport::DEFAULT_URL,
        subprotocol: holoplay_transport::DEFAULT_SUBPROTOCOL,
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        _ => {
            println!("name: {}", out.name);
            println!("version: {}", out.version);
            println!("target: {}", out.target);
            println!("profile: {}", out.profile);
            println!("default_url: {}", out.default_url);
            println!("subprotocol: {}", out.subprotocol);
        }
    }
    Ok(SUCCESS)
}
