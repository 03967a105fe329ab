use std::io::Read as _;
use std::process::ExitCode;
use std::{env, fs};

use ccs::{Options, actions, dead, echo, graph, parse, random, ttr};
use rand::thread_rng;

const USAGE: &str = "\
Usage: ccs [options] <command> [input-file]

Commands:
    graph      print the reachable LTS as a DOT graph
    random     walk one random path through the LTS
    actions    print every distinct action reachable from the main process
    dead       find and print a path to the first deadlock
    ttr        enumerate terminating traces by iterative deepening
    echo       pretty-print the parsed program back out

If <input-file> is absent or `-`, the program is read from stdin.

Options:
    -d, --depth N       maximum exploration depth (negative = unbounded, default -1)
    -i, --ignore-error  treat engine errors as warnings on stderr and continue
        --no-fold       disable constant folding of expressions
        --full-paths    print paths as `p --(a)--> q --(b)--> ...`
        --omit-names    omit process-term labels from graph nodes
    -h, --help          print this message and exit
";

struct Args {
    command: Option<String>,
    input: Option<String>,
    opts: Options,
    help: bool,
}

enum ArgError {
    /// `main.cpp` prints this one to stdout via `cout`, not stderr.
    InvalidNumber(String),
    Other(String),
}

fn parse_args(raw: Vec<String>) -> Result<Args, ArgError> {
    let mut opts = Options::default();
    let mut command: Option<String> = None;
    let mut input: Option<String> = None;
    let mut help = false;

    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => help = true,
            "-d" | "--depth" => {
                let value = iter.next().ok_or_else(|| ArgError::Other("missing value for --depth".to_string()))?;
                opts.max_depth = value.parse::<i64>().map_err(|_| ArgError::InvalidNumber(value.clone()))?;
            }
            "-i" | "--ignore-error" => opts.ignore_errors = true,
            "--no-fold" => opts.fold = false,
            "--full-paths" => opts.full_paths = true,
            "--omit-names" => opts.omit_names = true,
            other if command.is_none() => command = Some(other.to_string()),
            other if input.is_none() => input = Some(other.to_string()),
            _ => return Err(ArgError::Other("more than one input file given".to_string())),
        }
    }

    Ok(Args { command, input, opts, help })
}

fn read_source(input: Option<&str>) -> Result<(String, String), String> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(|err| format!("error reading stdin: {err}"))?;
            Ok((buf, "stdin".to_string()))
        }
        Some(path) => {
            let contents = fs::read_to_string(path).map_err(|err| format!("error reading '{path}': {err}"))?;
            Ok((contents, path.to_string()))
        }
    }
}

fn print_warnings(warnings: &[String]) {
    for w in warnings {
        eprintln!("{w}");
    }
}

fn run(command: &str, input: Option<&str>, opts: &Options) -> Result<(), String> {
    let (source, source_name) = read_source(input)?;
    let program = parse(&source, source_name).map_err(|err| err.to_string())?;

    match command {
        "echo" => {
            print!("{}", echo(&program));
            Ok(())
        }
        "actions" => {
            let (out, warnings) = actions(&program, opts).map_err(|err| err.to_string())?;
            print_warnings(&warnings);
            println!("{out}");
            Ok(())
        }
        "graph" => {
            let (out, warnings) = graph(&program, opts).map_err(|err| err.to_string())?;
            print_warnings(&warnings);
            print!("{out}");
            Ok(())
        }
        "dead" => {
            let (out, warnings) = dead(&program, opts).map_err(|err| err.to_string())?;
            print_warnings(&warnings);
            println!("{out}");
            Ok(())
        }
        "random" => {
            let mut rng = thread_rng();
            let (out, warnings) = random(&program, opts, &mut rng).map_err(|err| err.to_string())?;
            print_warnings(&warnings);
            println!("{out}");
            Ok(())
        }
        "ttr" => {
            let (out, warnings) = ttr(&program, opts).map_err(|err| err.to_string())?;
            print_warnings(&warnings);
            println!("{out}");
            Ok(())
        }
        other => Err(format!("unknown command: '{other}'\n\n{USAGE}")),
    }
}

fn main() -> ExitCode {
    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(raw) {
        Ok(args) => args,
        Err(ArgError::InvalidNumber(value)) => {
            println!("invalid number: {value}");
            return ExitCode::FAILURE;
        }
        Err(ArgError::Other(err)) => {
            eprintln!("error: {err}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let Some(command) = args.command else {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    };

    match run(&command, args.input.as_deref(), &args.opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
