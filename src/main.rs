use std::path::PathBuf;
use std::process::exit;

use clap::Parser;

mod driver;
mod toolchain;

#[derive(Parser, Debug)]
#[command(name = "titanc", version, about = "Titan ahead-of-time compiler", long_about = None)]
struct Args {
    /// Path to the input .titan source file
    input: PathBuf,

    /// Pretty-print the parsed AST and exit
    #[arg(long)]
    print_ast: bool,

    /// Pretty-print the checked module with type annotations and exit
    #[arg(long)]
    print_types: bool,

    /// Override the default output path (input path with the extension
    /// replaced)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let options = driver::Options {
        input: args.input,
        output: args.output,
        print_ast: args.print_ast,
        print_types: args.print_types,
    };
    match driver::run(options) {
        Ok(code) => exit(code),
        Err(err) => {
            eprintln!("titanc: {:#}", err);
            exit(2);
        }
    }
}
