use std::path::PathBuf;

use clap::Args;

use l2c::data::{oracle_sequences, read_trees, Vocab};
use l2c::system::{ParserState, SystemKind};
use l2c::Result;

#[derive(Args)]
pub struct OracleArgs {
    /// Tree corpus
    pub data: PathBuf,
    #[arg(long, default_value = "constituent")]
    pub system: SystemKind,
    /// Also print the tree the actions build
    #[arg(long)]
    pub tree: bool,
}

pub fn cmd_oracle(args: OracleArgs) -> Result<()> {
    let instances = read_trees(&args.data, &mut Vocab::new(), args.system)?;
    let system = args.system.transition_system();
    for (instance, actions) in instances.iter().zip(oracle_sequences(&instances, args.system)?) {
        let names: Vec<&str> = actions.iter().map(|&a| system.action_name(a)).collect();
        println!("{}", names.join(" "));
        if args.tree {
            let mut state = ParserState::new(instance.len());
            for &action in &actions {
                system.perform_action(&mut state, action)?;
            }
            print!("{}", system.render_tree(&state));
        }
    }
    Ok(())
}
