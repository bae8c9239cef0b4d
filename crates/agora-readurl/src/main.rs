use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: readurl url.txt");
        return ExitCode::from(1);
    }

    println!("Processing URL ...");
    match agora_readurl::run(Path::new(&args[1]), Path::new(".")) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("readurl: {:#}", e);
            ExitCode::from(1)
        }
    }
}
