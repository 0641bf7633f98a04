use clap::{ArgAction, ArgMatches, Command, command};
use clap_complete::{Shell, generate};
use log::LevelFilter;
use miette::{IntoDiagnostic, WrapErr};
use solb::writer::{self, SlnWriter};
use solg::deps::Deps;
use solg::generate::Generate;
use std::env;
use std::path::{self, PathBuf};
use std::{
    io,
    time::{Duration, Instant},
};

#[cfg(target_os = "linux")]
use mimalloc::MiMalloc;

#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[macro_use]
extern crate clap;

const PROJECT: &str = "PROJECT";
const PROJECT_DESCR: &str = "Sets project (.csproj or .vcxproj) path to generate solution for";
const SEARCH_DESCR: &str =
    "Directory to search project sources in. Could be specified several times. Project's directory by default";
const IGNORE_DESCR: &str =
    "Skip project files which path contains the pattern. Could be specified several times";

fn main() -> miette::Result<()> {
    let app = build_cli();
    let matches = app.get_matches();

    init_logging(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("generate", cmd)) => generate_solution(cmd),
        Some(("deps", cmd)) => print_deps(cmd),
        Some(("completion", cmd)) => {
            print_completions(cmd);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn generate_solution(cmd: &ArgMatches) -> miette::Result<()> {
    let now = Instant::now();
    let project = project_path(cmd)?;
    let output = match cmd.get_one::<PathBuf>("output") {
        Some(output) => path::absolute(output)
            .into_diagnostic()
            .wrap_err("Invalid solution path")?,
        None => solg::default_solution_path(&project),
    };
    let frameworks = cmd
        .get_one::<String>("frameworks")
        .map_or(solb::DEFAULT_TARGET_FRAMEWORKS, String::as_str);
    let roots = solg::search_roots(cmd.get_many::<PathBuf>("search"), &project);
    let ignored = solg::ignored_patterns(
        cmd.get_many::<String>("ignore"),
        cmd.get_flag("no-default-ignores"),
    );
    let root_path = env::current_dir().into_diagnostic()?;

    let mut analysis = solb::analyze_project(&output, &project, &roots, &ignored)?;
    analysis.solution.save(&root_path, frameworks, &SlnWriter)?;

    let report = Generate::new(&writer::target_path(&root_path, &analysis.solution), &analysis);
    print!("{report}");
    print_elapsed(now);

    if report.has_errors() && cmd.get_flag("fail") {
        std::process::exit(exitcode::DATAERR);
    }
    Ok(())
}

fn print_deps(cmd: &ArgMatches) -> miette::Result<()> {
    let now = Instant::now();
    let project = project_path(cmd)?;
    let roots = solg::search_roots(cmd.get_many::<PathBuf>("search"), &project);
    let ignored = solg::ignored_patterns(
        cmd.get_many::<String>("ignore"),
        cmd.get_flag("no-default-ignores"),
    );

    let analysis = solb::analyze_project(
        &solg::default_solution_path(&project),
        &project,
        &roots,
        &ignored,
    )?;

    print!("{}", Deps::new(analysis));
    print_elapsed(now);
    Ok(())
}

fn project_path(cmd: &ArgMatches) -> miette::Result<PathBuf> {
    let project = cmd
        .get_one::<PathBuf>(PROJECT)
        .ok_or_else(|| miette::miette!("Project path is required"))?;
    path::absolute(project)
        .into_diagnostic()
        .wrap_err_with(|| format!("Invalid project path: {}", project.display()))
}

fn print_elapsed(now: Instant) {
    let duration = now.elapsed().as_millis();
    let duration = Duration::from_millis(u64::try_from(duration).unwrap_or(u64::MAX));
    println!("{:>2} {}", "elapsed:", humantime::format_duration(duration));
}

fn print_completions(matches: &ArgMatches) {
    let mut cmd = build_cli();
    let bin_name = cmd.get_name().to_string();
    if let Some(generator) = matches.get_one::<Shell>("generator") {
        generate(*generator, &mut cmd, bin_name, &mut io::stdout());
    }
}

fn project_arg() -> clap::Arg {
    arg!([PROJECT])
        .value_parser(value_parser!(PathBuf))
        .help(PROJECT_DESCR)
        .required(true)
}

fn search_arg() -> clap::Arg {
    arg!(-s --search <DIR>)
        .value_parser(value_parser!(PathBuf))
        .action(ArgAction::Append)
        .required(false)
        .help(SEARCH_DESCR)
}

fn ignore_arg() -> clap::Arg {
    arg!(-i --ignore <PATTERN>)
        .action(ArgAction::Append)
        .required(false)
        .help(IGNORE_DESCR)
}

fn no_default_ignores_arg() -> clap::Arg {
    arg!(--"no-default-ignores")
        .required(false)
        .action(ArgAction::SetTrue)
        .help("Do not skip well-known vendor source trees")
}

fn build_cli() -> Command {
    command!(crate_name!())
        .arg_required_else_help(true)
        .version(crate_version!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .arg(
            arg!(-v --verbose ...)
                .global(true)
                .help("Increases logging verbosity. Could be repeated (-vv)"),
        )
        .subcommand(
            Command::new("generate")
                .aliases(["g", "gen"])
                .about("Generates solution that contains project and every project it references")
                .arg(project_arg())
                .arg(search_arg())
                .arg(
                    arg!(-o --output <SOLUTION>)
                        .value_parser(value_parser!(PathBuf))
                        .required(false)
                        .help("Solution path. Project's path with .sln extension by default"),
                )
                .arg(
                    arg!(-f --frameworks <FRAMEWORKS>)
                        .required(false)
                        .default_value(solb::DEFAULT_TARGET_FRAMEWORKS)
                        .help("Target frameworks which native projects are written into solution"),
                )
                .arg(ignore_arg())
                .arg(no_default_ignores_arg())
                .arg(
                    arg!(--fail)
                        .required(false)
                        .action(ArgAction::SetTrue)
                        .help("Return not zero exit code if some project files cannot be parsed"),
                ),
        )
        .subcommand(
            Command::new("deps")
                .aliases(["d"])
                .about("Shows projects the project references directly or transitively")
                .arg(project_arg())
                .arg(search_arg())
                .arg(ignore_arg())
                .arg(no_default_ignores_arg()),
        )
        .subcommand(
            Command::new("completion")
                .about("Generate the autocompletion script for the specified shell")
                .arg(
                    arg!([generator])
                        .value_parser(value_parser!(Shell))
                        .required(true)
                        .index(1),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn verify_cli() {
        build_cli().debug_assert();
    }

    #[rstest]
    #[case(&["solg", "generate", "App.csproj"])]
    #[case(&["solg", "g", "App.csproj", "-s", "/src", "-s", "/lib", "-o", "out/App.sln"])]
    #[case(&["solg", "generate", "App.csproj", "-f", "net472", "-i", "obj", "--no-default-ignores", "--fail"])]
    #[case(&["solg", "-vv", "deps", "App.csproj", "-s", "/src"])]
    #[case(&["solg", "completion", "bash"])]
    #[trace]
    fn parse_valid_args(#[case] args: &[&str]) {
        // Act
        let result = build_cli().try_get_matches_from(args);

        // Assert
        assert!(result.is_ok());
    }

    #[test]
    fn generate_defaults() {
        // Act
        let matches = build_cli()
            .try_get_matches_from(["solg", "generate", "App.csproj"])
            .unwrap();

        // Assert
        let (_, cmd) = matches.subcommand().unwrap();
        assert_eq!(
            Some(&solb::DEFAULT_TARGET_FRAMEWORKS.to_owned()),
            cmd.get_one::<String>("frameworks")
        );
        assert!(cmd.get_many::<PathBuf>("search").is_none());
        assert!(!cmd.get_flag("no-default-ignores"));
        assert_eq!(0, matches.get_count("verbose"));
    }

    #[test]
    fn several_search_roots() {
        // Act
        let matches = build_cli()
            .try_get_matches_from(["solg", "deps", "App.csproj", "-s", "/a", "--search", "/b"])
            .unwrap();

        // Assert
        let (_, cmd) = matches.subcommand().unwrap();
        let roots = cmd.get_many::<PathBuf>("search").unwrap().collect::<Vec<_>>();
        assert_eq!(vec![&PathBuf::from("/a"), &PathBuf::from("/b")], roots);
    }

    #[rstest]
    #[case(&["solg", "generate"])]
    #[case(&["solg", "deps"])]
    #[case(&["solg", "completion", "unknown"])]
    #[trace]
    fn parse_invalid_args(#[case] args: &[&str]) {
        // Act
        let result = build_cli().try_get_matches_from(args);

        // Assert
        assert!(result.is_err());
    }
}
