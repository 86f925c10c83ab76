use std::fs::File;

use clap::{arg, command, value_parser};
use log::{error, info};

use spalloc::config::{Config, MissingEligibility, StabilityPolicy};
use spalloc::engine;
use spalloc::error::AllocError;
use spalloc::io;
use spalloc::preferences::RankNotation;
use spalloc::problem::Problem;

fn main() {
    let args = command!()
        .about("Allocate students to projects, minimizing weighted dissatisfaction")
        .arg(arg!(<INPUT> "Input file in the simple JSON format"))
        .arg(arg!(-o --output <FILE> "Write the solution as JSON to this file"))
        .arg(arg!(--policy <POLICY>
            "Stability policy: minimize_only, require_stable or prefer_stable_fallback"))
        .arg(
            arg!(--"supervisor-weight" <WEIGHT>
                "Weight of supervisor preferences; students get 1 minus this")
            .value_parser(value_parser!(f64)),
        )
        .arg(
            arg!(--exponent <EXPONENT> "Power to raise dissatisfaction scores to (>= 1)")
                .value_parser(value_parser!(f64)),
        )
        .arg(arg!(--notation <NOTATION>
            "Default rank notation: fractional, competition or dense"))
        .arg(arg!(--"missing-eligibility" <POLICY>
            "Meaning of absent eligibility entries: eligible, ineligible or invalid"))
        .arg(arg!(--"explicit-rank-only"
            "Never assign a student to a project they did not explicitly rank"))
        .arg(arg!(--seed <SEED> "Seed of the deterministic shuffle").value_parser(value_parser!(u64)))
        .arg(
            arg!(--"time-limit" <SECONDS> "Solver time limit in seconds")
                .value_parser(value_parser!(f64)),
        )
        .arg(arg!(-v --verbose "Enable debug output"))
        .get_matches();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.get_flag("verbose") { "debug" } else { "info" }),
    )
    .init();

    let input_path = args.get_one::<String>("INPUT").unwrap();
    let file = match File::open(input_path) {
        Ok(file) => file,
        Err(e) => {
            error!("could not open {:?}: {}", input_path, e);
            std::process::exit(exitcode::NOINPUT);
        }
    };
    let mut input = match io::simple::read(file) {
        Ok(input) => input,
        Err(e) => {
            error!("could not parse {:?}: {}", input_path, e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!(
        "read {} supervisors, {} projects and {} students from {:?}",
        input.supervisors.len(),
        input.projects.len(),
        input.students.len(),
        input_path
    );

    let mut config = input.config.take().unwrap_or_default();
    apply_overrides(&mut config, &args);

    let problem = match Problem::new(
        input.supervisors,
        input.projects,
        input.students,
        input.eligibility,
        config,
    ) {
        Ok(problem) => problem,
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };

    match engine::solve(&problem) {
        Ok(solution) => {
            print!("{}", io::format_solution(&problem, &solution));
            if let Some(output_path) = args.get_one::<String>("output") {
                let file = match File::create(output_path) {
                    Ok(file) => file,
                    Err(e) => {
                        error!("could not create {:?}: {}", output_path, e);
                        std::process::exit(exitcode::CANTCREAT);
                    }
                };
                if let Err(e) = io::simple::write(file, &problem, &solution) {
                    error!("could not write {:?}: {}", output_path, e);
                    std::process::exit(exitcode::IOERR);
                }
                info!("wrote solution to {:?}", output_path);
            }
            std::process::exit(exitcode::OK);
        }
        Err(e @ AllocError::Solver(_)) => {
            error!("{}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::DATAERR);
        }
    }
}

fn apply_overrides(config: &mut Config, args: &clap::ArgMatches) {
    if let Some(policy) = args.get_one::<String>("policy") {
        config.stability_policy = match policy.as_str() {
            "minimize_only" => StabilityPolicy::MinimizeOnly,
            "require_stable" => StabilityPolicy::RequireStable,
            "prefer_stable_fallback" => StabilityPolicy::PreferStableFallback,
            other => {
                error!("unknown stability policy {:?}", other);
                std::process::exit(exitcode::USAGE);
            }
        };
    }
    if let Some(&weight) = args.get_one::<f64>("supervisor-weight") {
        config.supervisor_weight = weight;
        config.student_weight = 1.0 - weight;
    }
    if let Some(&exponent) = args.get_one::<f64>("exponent") {
        config.dissatisfaction_exponent = exponent;
    }
    if let Some(notation) = args.get_one::<String>("notation") {
        config.rank_notation = match notation.as_str() {
            "fractional" => RankNotation::Fractional,
            "competition" => RankNotation::Competition,
            "dense" => RankNotation::Dense,
            other => {
                error!("unknown rank notation {:?}", other);
                std::process::exit(exitcode::USAGE);
            }
        };
    }
    if let Some(policy) = args.get_one::<String>("missing-eligibility") {
        config.missing_eligibility = match policy.as_str() {
            "eligible" => MissingEligibility::Eligible,
            "ineligible" => MissingEligibility::Ineligible,
            "invalid" => MissingEligibility::Invalid,
            other => {
                error!("unknown missing-eligibility policy {:?}", other);
                std::process::exit(exitcode::USAGE);
            }
        };
    }
    if args.get_flag("explicit-rank-only") {
        config.explicit_rank_only = true;
    }
    if let Some(&seed) = args.get_one::<u64>("seed") {
        config.seed = seed;
    }
    if let Some(&limit) = args.get_one::<f64>("time-limit") {
        config.solver_time_limit = Some(limit);
    }
}
