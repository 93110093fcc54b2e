use colored::Colorize;
use machineflow_driver::FlagValue;
use machineflow_driver_ovh::create_flags;

pub fn handle() {
    println!("{}", "OVH ドライバーのオプション:".bold());
    println!();

    for flag in create_flags() {
        println!("  --{}", flag.name.cyan());
        println!("      {}", flag.usage);
        if let FlagValue::String(default) = &flag.value {
            if !default.is_empty() {
                println!("      デフォルト: {}", default.green());
            }
        }
        if let Some(env) = flag.env_var {
            println!("      環境変数: {}", env.yellow());
        }
    }
}
