use std::collections::BTreeMap;

use clap::Parser;

use reach_order::analysis::analyze;
use reach_order::config::AnalysisConfig;
use reach_order::model::{ModelBuilder, ParametricModel};
use reach_order::property::Property;
use reach_order::region::Region;
use reach_order::solver::default_solver;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of inner states of the random walk.
    #[arg(value_name = "INT", default_value = "6")]
    n: usize,

    /// Parameter region, for example "0.1<=p<=0.9,0.2<=q<=0.8".
    #[clap(long, value_name = "REGION")]
    region: Option<String>,

    /// Let even states move up with `q` instead of `p`.
    #[clap(long)]
    two_parameters: bool,

    /// Number of samples used to refute assumptions and monotonicity.
    #[clap(long, value_name = "INT", default_value = "0")]
    samples: usize,

    /// Explore branches in parallel.
    #[clap(long)]
    parallel: bool,

    /// Print every order in DOT format.
    #[clap(long)]
    dot: bool,
}

/// Random walk on `0..=n+1`: state 0 loses, state `n+1` wins.
fn random_walk(n: usize, two_parameters: bool) -> color_eyre::Result<ParametricModel> {
    let mut builder = ModelBuilder::new(n + 2);
    builder.add_action_str(0, &[(0, "1")])?;
    builder.add_action_str(n + 1, &[(n + 1, "1")])?;
    for i in 1..=n {
        let (up, down) = if two_parameters && i % 2 == 0 { ("q", "1-q") } else { ("p", "1-p") };
        builder.add_action_str(i, &[(i + 1, up), (i - 1, down)])?;
    }
    builder.initial(1).label("win", n + 1);
    Ok(builder.build()?)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let model = random_walk(args.n, args.two_parameters)?;
    let goal = model
        .label("win")
        .cloned()
        .ok_or_else(|| color_eyre::eyre::eyre!("model has no `win` label"))?;
    let property = Property::eventually(goal);
    let region = args.region.as_deref().map(Region::parse).transpose()?;
    let config = AnalysisConfig {
        number_of_samples: args.samples,
        parallel: args.parallel,
        ..AnalysisConfig::default()
    };
    let solver = default_solver(&config.solver);

    let result = analyze(&model, &property, region.as_ref(), solver.as_ref(), &config)?;
    print!("{}", result);

    let verdicts: BTreeMap<&String, _> = model.parameters().iter().map(|p| (p, result.verdict(p))).collect();
    for (parameter, verdict) in &verdicts {
        println!("{}: {}", parameter, verdict);
    }

    if args.dot {
        for (i, branch) in result.branches.iter().enumerate() {
            println!("// branch {}", i);
            print!("{}", branch.order.to_dot()?);
        }
    }

    let time_total = time_total.elapsed();
    println!("Total time: {:.3} s", time_total.as_secs_f64());

    Ok(())
}
