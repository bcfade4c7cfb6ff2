use lcdplay::app::{self, AppOptions};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let report = app::run(options)?;
    if report.failed > 0 {
        eprintln!(
            "{} of {} tracks could not be played",
            report.failed,
            report.played.len()
        );
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<AppOptions> {
    let mut out = AppOptions::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--null-output" => out.null_output = true,
            "--plain" => out.plain = true,
            "--device" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--device requires a device name");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--device cannot be empty");
                }
                out.device = Some(value.trim().to_string());
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--" => {
                out.paths
                    .extend(args[index + 1..].iter().map(PathBuf::from));
                break;
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument {other}"),
            path => out.paths.push(PathBuf::from(path)),
        }
        index += 1;
    }

    if out.paths.is_empty() {
        print_help();
        anyhow::bail!("no tracks given");
    }
    Ok(out)
}

fn print_help() {
    println!("lcdplay <track or folder>...");
    println!("  --device NAME     Play through the named output device");
    println!("  --null-output     Decode without an audio device");
    println!("  --plain           Log display updates instead of drawing a panel");
    println!("  -h, --help        Show this help");
    println!();
    println!("Keys: space pause, n next, b previous, i artist/album, q quit");
}
