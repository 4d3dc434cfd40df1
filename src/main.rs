use bctransform::config::{command, Options};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let matches = command().get_matches();
    let result = Options::from_matches(&matches).and_then(|options| bctransform::run(&options));
    match result {
        Ok(report) => {
            println!("Transformed classes: {}", report.transformed_classes);
            println!("Transformed methods: {}", report.transformed_methods);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
