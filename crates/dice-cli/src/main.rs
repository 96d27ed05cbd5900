#![forbid(unsafe_code)]

use clap::Parser;

fn main() {
    let cli = dice_cli::Cli::parse();
    let json_errors = cli.log_format.is_json();
    if let Err(error) = dice_cli::run(cli) {
        if json_errors {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                })
            );
        } else {
            eprintln!("dice: {error}");
        }
        std::process::exit(error.exit_code());
    }
}
