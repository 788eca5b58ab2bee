use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    process::{exit, Command},
    rc::Rc,
};

use abacus::{
    compiler::compiler::{compile_file, compile_package, Output},
    display_error,
    errors::errors::Error,
    lexer::lexer::tokenize,
    parser::parser::{parse_file, parse_package},
};

const VERSION: &str = "Abacus Compiler Tool Version 0.1.0";
const SOURCE_EXT: &str = "ab";

/// Command line options, hand-parsed from `env::args`.
struct Options {
    /// Stop after emitting lowered code; skip the C toolchain.
    emit_only: bool,
    cc: String,
    cflags: String,
    cout: String,
    ld: String,
    ldflags: String,
    path: PathBuf,
}

fn usage() -> ! {
    eprintln!("{}", VERSION);
    eprintln!();
    eprintln!("Usage: abacus [flags] <file-or-directory>");
    eprintln!();
    eprintln!("  -s                generate lowered C code but do not compile");
    eprintln!("  --cc <bin>        C compiler to use (default gcc)");
    eprintln!("  --cflags <flags>  C compiler flags (default \"-c -std=gnu99\")");
    eprintln!("  --cout <flag>     C compiler output flag (default --output=)");
    eprintln!("  --ld <bin>        linker to use (default gcc)");
    eprintln!("  --ldflags <flags> linker flags");
    eprintln!("  -v                print version and exit");
    exit(1);
}

fn parse_options() -> Options {
    let mut options = Options {
        emit_only: false,
        cc: String::from("gcc"),
        cflags: String::from("-c -std=gnu99"),
        cout: String::from("--output="),
        ld: String::from("gcc"),
        ldflags: String::new(),
        path: PathBuf::new(),
    };

    let mut path = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-s" => options.emit_only = true,
            "-v" => {
                eprintln!("{}", VERSION);
                exit(0);
            }
            "--cc" => options.cc = args.next().unwrap_or_else(|| usage()),
            "--cflags" => options.cflags = args.next().unwrap_or_else(|| usage()),
            "--cout" => options.cout = args.next().unwrap_or_else(|| usage()),
            "--ld" => options.ld = args.next().unwrap_or_else(|| usage()),
            "--ldflags" => options.ldflags = args.next().unwrap_or_else(|| usage()),
            _ if arg.starts_with('-') => usage(),
            _ => {
                if path.is_some() {
                    usage();
                }
                path = Some(PathBuf::from(arg));
            }
        }
    }

    options.path = match path {
        Some(path) => path,
        None => env::current_dir().unwrap_or_else(|error| fatal(&error.to_string())),
    };
    options
}

fn fatal(message: &str) -> ! {
    eprintln!("{}", message);
    exit(1);
}

fn read_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|error| fatal(&format!("{}: {}", path.display(), error)))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Prints a front-end error against the file it came from and exits.
fn report_and_exit(error: Error, sources: &HashMap<String, String>) -> ! {
    let file = error.get_position().1.to_string();
    let source = sources.get(&file).map(String::as_str).unwrap_or("");
    display_error(&error, source);
    exit(1);
}

fn main() {
    let options = parse_options();

    let path = &options.path;
    let metadata = fs::metadata(path)
        .unwrap_or_else(|error| fatal(&format!("{}: {}", path.display(), error)));

    println!("Compiling: {}", file_name_of(path));

    // Sources are kept around so diagnostics can be rendered against them.
    let mut sources = HashMap::new();

    let output = if metadata.is_dir() {
        compile_dir(path, &mut sources)
    } else {
        compile_one(path, &mut sources)
    };

    if !output.diagnostics.is_empty() {
        for error in output.diagnostics.errors() {
            let file = error.get_position().1.to_string();
            let source = sources.get(&file).map(String::as_str).unwrap_or("");
            display_error(error, source);
        }
        exit(1);
    }

    let out_base = path.with_extension("");
    let c_path = out_base.with_extension("c");
    fs::write(&c_path, &output.code)
        .unwrap_or_else(|error| fatal(&format!("{}: {}", c_path.display(), error)));

    if options.emit_only {
        return;
    }

    run_toolchain(&options, &out_base);
}

fn compile_one(path: &Path, sources: &mut HashMap<String, String>) -> Output {
    let file = file_name_of(path);
    let source = read_source(path);
    sources.insert(file.clone(), source.clone());

    let tokens = match tokenize(source, Some(file.clone())) {
        Ok(tokens) => tokens,
        Err(error) => report_and_exit(error, sources),
    };

    let parsed = match parse_file(tokens, Rc::new(file)) {
        Ok(parsed) => parsed,
        Err(error) => report_and_exit(error, sources),
    };

    match compile_file(&parsed) {
        Ok(output) => output,
        Err(error) => fatal(&error.to_string()),
    }
}

/// Compiles every source file in a directory as one package sharing a
/// single top-level scope.
fn compile_dir(path: &Path, sources: &mut HashMap<String, String>) -> Output {
    let entries = fs::read_dir(path)
        .unwrap_or_else(|error| fatal(&format!("{}: {}", path.display(), error)));

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == SOURCE_EXT).unwrap_or(false))
        .collect();
    paths.sort();

    if paths.is_empty() {
        fatal(&format!("no .{} files in {}", SOURCE_EXT, path.display()));
    }

    let mut files = vec![];
    for path in &paths {
        let file = file_name_of(path);
        let source = read_source(path);
        sources.insert(file.clone(), source.clone());

        match tokenize(source, Some(file.clone())) {
            Ok(tokens) => files.push((Rc::new(file), tokens)),
            Err(error) => report_and_exit(error, sources),
        }
    }

    let package = match parse_package(files) {
        Ok(package) => package,
        Err(error) => report_and_exit(error, sources),
    };

    match compile_package(&package) {
        Ok(output) => output,
        Err(error) => fatal(&error.to_string()),
    }
}

/// Finds the runtime support directory (headers plus runtime.a).
fn find_runtime() -> String {
    match env::var("ABACUS_RUNTIME") {
        Ok(path) if Path::new(&path).join("runtime.a").exists() => path,
        _ => fatal(
            "Unable to find the runtime library. Set ABACUS_RUNTIME to the \
             directory containing runtime.h and runtime.a",
        ),
    }
}

fn cleanup(base: &Path) {
    let _ = fs::remove_file(base.with_extension("c"));
    let _ = fs::remove_file(base.with_extension("o"));
}

fn run_toolchain(options: &Options, base: &Path) {
    let runtime = find_runtime();
    let c_path = base.with_extension("c");
    let o_path = base.with_extension("o");

    // Compile the lowered C to object code.
    let mut args: Vec<String> = options
        .cflags
        .split_whitespace()
        .map(String::from)
        .collect();
    args.push(format!("-I{}", runtime));
    args.push(format!("{}{}", options.cout, o_path.display()));
    args.push(c_path.display().to_string());

    let result = Command::new(&options.cc).args(&args).output();
    match result {
        Ok(result) if result.status.success() => {}
        Ok(result) => {
            cleanup(base);
            fatal(&String::from_utf8_lossy(&result.stderr));
        }
        Err(error) => {
            cleanup(base);
            fatal(&format!("{}: {}", options.cc, error));
        }
    }

    // Link against the runtime.
    let mut args: Vec<String> = options
        .ldflags
        .split_whitespace()
        .map(String::from)
        .collect();
    args.push(format!("{}{}", options.cout, base.display()));
    args.push(o_path.display().to_string());
    args.push(format!("{}/runtime.a", runtime));

    let result = Command::new(&options.ld).args(&args).output();
    match result {
        Ok(result) if result.status.success() => {}
        Ok(result) => {
            cleanup(base);
            fatal(&String::from_utf8_lossy(&result.stderr));
        }
        Err(error) => {
            cleanup(base);
            fatal(&format!("{}: {}", options.ld, error));
        }
    }

    cleanup(base);
}
