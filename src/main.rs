use std::io::{self, BufRead};
use std::process;

use colored::Colorize;
use epsilon_regex::{Matcher, Pattern, ReError};

fn print_usage() {
    eprintln!(
        "\
Usage: epsilon_regex [OPTIONS] <pattern> [text]...

Prints whether each text matches the pattern as a whole and every match
found in it. Texts are read from stdin, one per line, when none are given.

Options:
  --all        Report overlapping matches too
  --dot        Print the automaton as Graphviz DOT and exit
  -h, --help   Print this help message"
    );
}

struct Options {
    pattern: String,
    texts: Vec<String>,
    all: bool,
    dot: bool,
}

fn parse_args() -> Options {
    let mut all = false;
    let mut dot = false;
    let mut positional = Vec::new();

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "--all" => all = true,
            "--dot" => dot = true,
            other if other.starts_with("--") => {
                eprintln!("error: unknown option: {}", other);
                print_usage();
                process::exit(2);
            }
            _ => positional.push(arg),
        }
    }

    if positional.is_empty() {
        print_usage();
        process::exit(2);
    }
    let pattern = positional.remove(0);
    Options {
        pattern,
        texts: positional,
        all,
        dot,
    }
}

fn compile(pattern: &str) -> Pattern {
    Pattern::compile(pattern).unwrap_or_else(|e| {
        match e {
            ReError::ParsingFailed(err) => eprintln!("{}", err.render(pattern)),
            other => eprintln!("error: {}", other),
        }
        process::exit(1);
    })
}

fn highlight(text: &str, spans: &[(usize, usize)]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut position = 0;
    for &(start, end) in spans {
        if start < position {
            continue;
        }
        out.extend(&chars[position..start]);
        let matched: String = chars[start..end].iter().collect();
        out += &matched.black().on_yellow().to_string();
        position = end;
    }
    out.extend(&chars[position..]);
    out
}

fn report(matcher: &mut Matcher, text: &str, all: bool) -> Result<(), ReError> {
    let verdict = if matcher.matches() {
        "matches".green()
    } else {
        "no match".red()
    };
    println!("{:?}: {}", text, verdict);

    matcher.find_matches(all);
    let mut spans = Vec::new();
    while matcher.find() {
        let (start, end) = (matcher.start()?, matcher.end()?);
        println!("  [{}, {}) {:?}", start, end, matcher.group()?);
        spans.push((start, end));
    }
    if !spans.is_empty() {
        println!("  {}", highlight(text, &spans));
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let options = parse_args();
    let pattern = compile(&options.pattern);

    if options.dot {
        println!("{}", pattern.render());
        return;
    }

    let texts = if options.texts.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<String>>>()
            .unwrap_or_else(|e| {
                eprintln!("error: failed to read stdin: {}", e);
                process::exit(2);
            })
    } else {
        options.texts
    };

    for text in &texts {
        let mut matcher = pattern.matcher(text);
        if let Err(e) = report(&mut matcher, text, options.all) {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
