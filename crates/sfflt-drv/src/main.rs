use std::process::ExitCode;

fn main() -> ExitCode {
    match sfflt_drv::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
