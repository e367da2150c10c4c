#![allow(clippy::uninlined_format_args)]

use lazyre::backends::{self, Dfa, Nfa};
use lazyre::{Error, Flags, Options, Regex};
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "lazyre-tool")]
struct Opt {
    /// The regular expression.
    pattern: String,

    /// The flags of the regular expression.
    #[structopt(long, short, parse(from_str = Flags::from))]
    flags: Option<Flags>,

    /// Engine options, like `Flavor=Python,Encoding=LATIN-1`.
    #[structopt(long, short)]
    options: Option<Options>,

    /// Dump the parsed AST to stdout.
    #[structopt(long)]
    dump_ast: bool,

    /// Dump the NFA to stdout.
    #[structopt(long)]
    dump_nfa: bool,

    /// Dump the DFA to stdout, after matching.
    #[structopt(long)]
    dump_dfa: bool,

    /// Dump all regular expression compilation phases to stdout.
    #[structopt(long)]
    dump_phases: bool,

    /// Only check that the pattern compiles to a complete DFA.
    #[structopt(long)]
    validate: bool,

    /// Use the NFA simulation for execution.
    #[structopt(long)]
    nfa: bool,

    /// The input values to match against.
    #[structopt(conflicts_with_all = &["bench", "file"])]
    inputs: Vec<String>,

    /// Match against the contents of a specified file.
    #[structopt(long, conflicts_with_all = &["bench", "inputs"])]
    file: Option<PathBuf>,

    /// Benchmark the matches of the specified file.
    #[structopt(long, conflicts_with_all = &["file", "inputs"])]
    bench: Option<PathBuf>,
}

fn format_match(r: &lazyre::Match, input: &str) -> String {
    let mut result = String::new();

    // Show the full matched range
    result.push_str(&format!(
        "\"{}\" ({}..{})",
        &input[r.range()],
        r.range().start,
        r.range().end
    ));

    // Show capture groups if any exist
    if !r.captures.is_empty() {
        result.push_str(", captures: [");
        for (i, cg) in r.captures.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            if let Some(cg_range) = cg {
                result.push_str(&format!(
                    "\"{}\" ({}..{})",
                    &input[cg_range.clone()],
                    cg_range.start,
                    cg_range.end
                ));
            } else {
                result.push_str("None");
            }
        }
        result.push(']');
    }

    result
}

fn exec_re_on_string(re: &Regex, input: &str) {
    if re.options().boolean_match {
        println!("{}", if re.is_match(input) { "Match" } else { "No match" });
        return;
    }
    let mut matches = re.find_iter(input);
    if let Some(res) = matches.next() {
        let count = 1 + matches.count();
        println!("Match: {}, total: {}", format_match(&res, input), count);
    } else {
        println!("No match");
    }
}

fn exec_nfa_on_string(re: &Regex, input: &str) {
    match backends::find_nfa(re, lazyre::Utf8Input::new(input), 0) {
        Some(m) => println!("Match: {}, total: 1", format_match(&m, input)),
        None => println!("No match"),
    }
}

fn bench_re_on_path(re: &Regex, path: &Path) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            println!("{}: {}", err, path.display());
            return;
        }
    };
    let input = contents.as_str();
    // Warmup
    re.find_iter(input).count();
    let start = Instant::now();
    for _ in 0..25 {
        re.find_iter(input).count();
    }
    let duration = start.elapsed();
    println!("{} ms", duration.as_millis());
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Opt::from_args();

    let flags = args.flags.unwrap_or_default();
    let options = args.options.clone().unwrap_or_default();
    debug!("flags: {}, options: {:?}", flags, options);

    if args.validate {
        lazyre::validate(&args.pattern, flags, options)?;
        println!("Valid");
        return Ok(());
    }

    if args.dump_phases || args.dump_ast || args.dump_nfa {
        let ast = backends::try_parse(args.pattern.chars().map(u32::from), flags, &options)?;
        if args.dump_phases || args.dump_ast {
            println!("AST:\n{}", ast);
        }
        let nfa = Nfa::try_from(&ast, &options)?;
        if args.dump_phases || args.dump_nfa {
            println!("NFA:\n{}", nfa.to_readable_string());
        }
        if args.dump_phases {
            let dfa = Dfa::try_from(nfa, &options)?;
            println!("DFA:\n{}", dfa);
        }
    }

    let re = Regex::with_options(&args.pattern, flags, options)?;
    println!("Mode: {:?}", re.exec_mode());

    if let Some(ref path) = args.file {
        match fs::read_to_string(path) {
            Ok(contents) if args.nfa => exec_nfa_on_string(&re, contents.as_str()),
            Ok(contents) => exec_re_on_string(&re, contents.as_str()),
            Err(err) => println!("{}: {}", err, path.display()),
        };
    } else if let Some(ref path) = args.bench {
        bench_re_on_path(&re, path);
    } else {
        for input in &args.inputs {
            if args.nfa {
                exec_nfa_on_string(&re, input);
            } else {
                exec_re_on_string(&re, input);
            }
        }
    }

    if args.dump_dfa {
        println!("DFA:\n{}", re.dump_dfa());
    }
    Ok(())
}
