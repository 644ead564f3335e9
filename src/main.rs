use clap::{Parser, Subcommand};
use std::process;

mod cli;

#[derive(Parser)]
#[command(
    name = "l2c",
    version,
    about = "Learning to compose words into sentences with shift-reduce Tree-LSTMs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model and write checkpoints
    Train(cli::train::TrainArgs),
    /// Score a checkpoint on a corpus
    Eval(cli::eval::EvalArgs),
    /// Print the oracle action sequence of every gold tree
    Oracle(cli::oracle::OracleArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Train(args) => cli::train::cmd_train(args),
        Command::Eval(args) => cli::eval::cmd_eval(args),
        Command::Oracle(args) => cli::oracle::cmd_oracle(args),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
