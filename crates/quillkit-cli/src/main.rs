use anyhow::{Context, Result, bail};
use quillkit_engine::{Editor, Payload};
use std::{env, fs, path::PathBuf, process};

/// Batch harness for the editing engine: load a markup file, run a sequence
/// of dispatcher operations against it, and print (or write back) the
/// serialized result. Mirrors what a host toolbar would do, one `--op` per
/// button press.
struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    ops: Vec<(String, Vec<Payload>)>,
    outline: bool,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;

    let mut editor = Editor::new();
    if let Some(path) = &args.input {
        let markup = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        editor
            .load_serialized_content(markup.trim())
            .with_context(|| format!("parsing {}", path.display()))?;
    }

    for (name, op_args) in &args.ops {
        // The harness has no interactive caret; operate from the end of
        // the document, where appended content lands.
        editor.select_end();
        if !editor.exec(name, op_args) {
            log::warn!("`{name}` had no effect");
        }
        // Drain the settle window so each op is its own history entry.
        for _ in 0..8 {
            editor.tick();
        }
    }

    if args.outline {
        for entry in editor.outline() {
            let id = entry
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("h{} {} {}", entry.level, id, entry.text);
        }
        return Ok(());
    }

    let markup = editor.get_serialized_content();
    match &args.output {
        Some(path) => fs::write(path, &markup)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{markup}"),
    }
    Ok(())
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        input: None,
        output: None,
        ops: Vec::new(),
        outline: false,
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--op" => {
                let spec = iter.next().context("--op needs a value, e.g. `applyBlockFormat=\"heading1\"`")?;
                args.ops.push(parse_op(&spec)?);
            }
            "--out" => {
                let path = iter.next().context("--out needs a file path")?;
                args.output = Some(PathBuf::from(path));
            }
            "--outline" => args.outline = true,
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown flag `{other}`"),
            other => {
                if args.input.is_some() {
                    bail!("only one input file is supported");
                }
                args.input = Some(PathBuf::from(other));
            }
        }
    }
    Ok(args)
}

/// An op spec is `name` or `name=args`, where `args` is a JSON value: a
/// single scalar becomes the only argument, an array is passed through.
fn parse_op(spec: &str) -> Result<(String, Vec<Payload>)> {
    let (name, raw) = match spec.split_once('=') {
        Some((name, raw)) => (name, Some(raw)),
        None => (spec, None),
    };
    let op_args = match raw {
        None => Vec::new(),
        Some(raw) => {
            let value: Payload = serde_json::from_str(raw)
                .with_context(|| format!("`{name}` arguments are not valid JSON: {raw}"))?;
            match value {
                Payload::Array(items) => items,
                single => vec![single],
            }
        }
    };
    Ok((name.to_string(), op_args))
}

fn print_usage() {
    println!(
        "usage: quillkit-cli [FILE] [--op NAME[=JSON]]... [--outline] [--out FILE]\n\n\
         examples:\n  \
         quillkit-cli note.qml --op 'applyBlockFormat=\"heading1\"'\n  \
         quillkit-cli note.qml --op 'insertCustomBlock=[\"image\",{{\"src\":\"a.png\"}}]' --out note.qml\n  \
         quillkit-cli note.qml --outline"
    );
}
