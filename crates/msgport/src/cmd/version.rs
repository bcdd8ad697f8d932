use crate::build_info::BuildInfo;
use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let build = BuildInfo::current();
    println!("msgport {}", build.version);
    if args.extended {
        println!("target: {}", build.target);
        println!("profile: {}", build.profile);
        println!("features: {}", build.features.join(", "));
    }
    Ok(SUCCESS)
}
