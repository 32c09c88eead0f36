use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rsss {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rsss");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("RSSS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: peer={}, async={}, cli=true",
        cfg!(feature = "peer"),
        cfg!(feature = "async")
    );
    println!(
        "wire: marker=0x{:02X} crc8_seed=0x{:02X} crc16_seed=0x{:04X} max_payload={}",
        rsss_frame::MARKER,
        rsss_frame::CRC8_SEED,
        rsss_frame::CRC16_SEED,
        rsss_frame::MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
