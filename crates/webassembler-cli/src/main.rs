use std::process;

fn main() {
    match webassembler_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("webassembler error: {err}");
            process::exit(1);
        }
    }
}
