//! Command implementations for the CLI tool.

use std::io::{self, Write};
use std::path::Path;

use arcgate::command::eval_line;
use arcgate::{Error, ExtractTarget, Library, ListOptions, OpenOptions};

use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{OutputFormatter, create_formatter};
use crate::password;
use crate::stdio::{StdinChannel, StdoutChannel};
use crate::{OpenArgs, OutputFormat};

/// Configuration for the extract command.
pub struct ExtractConfig<'a> {
    pub open: &'a OpenArgs,
    pub item: &'a str,
    pub destination: Option<&'a Path>,
    pub stdout: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Info command implementation
pub fn info(open: &OpenArgs, format: OutputFormat, quiet: bool) -> ExitCode {
    let formatter = create_formatter(format);
    let mut library = Library::new();
    let (id, _) = match open_session(&mut library, open) {
        Ok(session) => session,
        Err(e) => return report_error(&e, quiet),
    };

    match library.session(&id).and_then(|view| view.info()) {
        Ok(info) => {
            print!("{}", formatter.format_info(&info));
            ExitCode::Success
        }
        Err(e) => report_error(&e, quiet),
    }
}

/// Count command implementation
pub fn count(open: &OpenArgs, format: OutputFormat, quiet: bool) -> ExitCode {
    let formatter = create_formatter(format);
    let mut library = Library::new();
    let (id, _) = match open_session(&mut library, open) {
        Ok(session) => session,
        Err(e) => return report_error(&e, quiet),
    };

    match library.session(&id).and_then(|view| view.count()) {
        Ok(count) => {
            print!("{}", formatter.format_count(count));
            ExitCode::Success
        }
        Err(e) => report_error(&e, quiet),
    }
}

/// List command implementation
pub fn list(open: &OpenArgs, options: &ListOptions, format: OutputFormat, quiet: bool) -> ExitCode {
    let formatter = create_formatter(format);
    let mut library = Library::new();
    let (id, _) = match open_session(&mut library, open) {
        Ok(session) => session,
        Err(e) => return report_error(&e, quiet),
    };

    match library.session(&id).and_then(|view| view.list(options)) {
        Ok(entries) => {
            print!("{}", formatter.format_list(&entries));
            ExitCode::Success
        }
        Err(e) => report_error(&e, quiet),
    }
}

/// Extract command implementation
pub fn extract(config: &ExtractConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);
    let mut library = Library::new();
    let (id, mut pwd) = match open_session(&mut library, config.open) {
        Ok(session) => session,
        Err(e) => return report_error(&e, config.quiet),
    };

    let (target, destination_name) = match (config.stdout, config.destination) {
        (true, _) => {
            library
                .channels_mut()
                .register("stdout", StdoutChannel::default());
            (ExtractTarget::channel("stdout"), "stdout".to_string())
        }
        (false, Some(path)) => (
            ExtractTarget::path(path),
            path.to_string_lossy().into_owned(),
        ),
        (false, None) => {
            eprintln!("Error: no destination given");
            return ExitCode::BadArgs;
        }
    };

    let mut result = library.extract(&id, config.item, &with_password(&target, &pwd));
    if let Err(e) = &result {
        if password::needs_password(e, pwd.as_deref()) {
            if let Some(prompted) = password::prompt() {
                pwd = Some(prompted);
                result = library.extract(&id, config.item, &with_password(&target, &pwd));
            }
        }
    }

    match result {
        Ok(()) => {
            if !config.quiet && !config.stdout {
                print!("{}", formatter.format_extract(config.item, &destination_name));
            }
            ExitCode::Success
        }
        Err(e) => report_error(&e, config.quiet),
    }
}

/// Extensions command implementation
pub fn extensions(format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    let library = Library::new();
    print!("{}", formatter.format_extensions(&library.supported_extensions()));
    ExitCode::Success
}

/// Shell command implementation
///
/// Each line of standard input is one protocol command. Replies go to
/// standard output and errors to standard error; evaluation continues after
/// a failed command. The exit code reflects the last failure, if any.
pub fn shell(format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    let mut library = Library::new();
    library
        .channels_mut()
        .register("stdin", StdinChannel::default());
    library
        .channels_mut()
        .register("stdout", StdoutChannel::default());

    let mut exit_code = ExitCode::Success;
    let mut line = String::new();
    loop {
        line.clear();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                return ExitCode::IoError;
            }
        }
        let command = line.trim();
        if command.is_empty() || command.starts_with('#') {
            continue;
        }
        if let Some(code) = run_line(&mut library, command, formatter.as_ref()) {
            exit_code = code;
        }
    }
    exit_code
}

fn run_line(library: &mut Library, line: &str, formatter: &dyn OutputFormatter) -> Option<ExitCode> {
    match eval_line(library, line) {
        Ok(reply) => {
            let mut stdout = io::stdout().lock();
            let _ = write!(stdout, "{}", formatter.format_reply(&reply));
            let _ = stdout.flush();
            None
        }
        Err(e) => {
            eprint!("{}", formatter.format_error(&e));
            Some(error_to_exit_code(&e))
        }
    }
}

fn open_options(args: &OpenArgs) -> OpenOptions {
    let mut options = OpenOptions::path(args.archive.as_str())
        .multivolume(args.multivolume)
        .detect_type(args.detect_type);
    if let Some(forced) = &args.force_type {
        options = options.force_type(forced.as_str());
    }
    if let Some(pwd) = &args.password {
        options = options.password(pwd.as_str());
    }
    options
}

/// Opens a session, prompting for a password if the archive needs one.
///
/// Returns the session id and the password in effect.
fn open_session(library: &mut Library, args: &OpenArgs) -> arcgate::Result<(String, Option<String>)> {
    let mut options = open_options(args);
    match library.open(&options) {
        Ok(id) => Ok((id, options.password)),
        Err(e) if password::needs_password(&e, options.password.as_deref()) => {
            let Some(prompted) = password::prompt() else {
                return Err(e);
            };
            options.password = Some(prompted);
            let id = library.open(&options)?;
            Ok((id, options.password))
        }
        Err(e) => Err(e),
    }
}

fn with_password(target: &ExtractTarget, pwd: &Option<String>) -> ExtractTarget {
    ExtractTarget {
        destination: target.destination.clone(),
        password: pwd.clone(),
    }
}

fn report_error(error: &Error, quiet: bool) -> ExitCode {
    eprintln!("Error: {}", error);
    if let Error::Engine {
        detail: Some(detail),
        ..
    } = error
    {
        if !quiet {
            eprintln!("  {}", detail);
        }
    }
    error_to_exit_code(error)
}
