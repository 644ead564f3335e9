use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};

use burn::tensor::backend::Backend;

use l2c::checkpoint::{Checkpoint, CheckpointTag};
use l2c::eval::{evaluate, PredictMode};
use l2c::data::Instance;
use l2c::model::{Model, PolicyKind};
use l2c::{Error, Result};

use super::{read_held_out, EvalBackend, Format};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Tag {
    Best,
    Latest,
}

#[derive(Args)]
pub struct EvalArgs {
    /// Checkpoint directory written by `l2c train`
    #[arg(short, long, default_value = "checkpoints")]
    pub checkpoint: PathBuf,
    #[arg(long, value_enum, default_value = "best")]
    pub tag: Tag,
    /// Corpus to score
    pub data: PathBuf,
    #[arg(long, value_enum, default_value = "sentences")]
    pub format: Format,
    /// sample (greedy), left or right
    #[arg(long, default_value = "sample")]
    pub policy: PolicyKind,
    /// Parse along the gold trees instead of the policy
    #[arg(long)]
    pub oracle: bool,
    /// Write `gold: X pred: Y` and the tree of every instance here (`-` for stdout)
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub fn cmd_eval(args: EvalArgs) -> Result<()> {
    let tag = match args.tag {
        Tag::Best => CheckpointTag::Best,
        Tag::Latest => CheckpointTag::Latest,
    };
    let device = Default::default();
    let mut loaded = Checkpoint::new(&args.checkpoint).load::<EvalBackend>(tag, &device)?;
    let instances = read_held_out(
        Some(args.data.as_path()),
        args.format,
        &mut loaded.vocab,
        loaded.config.system,
        loaded.config.n_classes,
    )?;

    let mode = if args.oracle {
        PredictMode::Oracle
    } else {
        PredictMode::Policy(args.policy)
    };
    let accuracy = score(&loaded.model, &instances, mode, args.report.as_deref())?;
    println!("accuracy {accuracy:.4} over {} instances", instances.len());
    Ok(())
}

/// Accuracy of `model`, with the per-instance report written to `report`
/// (`-` for stdout) when one is given.
fn score<B: Backend>(
    model: &Model<B>,
    instances: &[Instance],
    mode: PredictMode,
    report: Option<&Path>,
) -> Result<f64> {
    let mut writer: Option<Box<dyn Write>> = match report {
        Some(path) if path.as_os_str() == "-" => Some(Box::new(io::stdout().lock())),
        Some(path) => {
            let file = File::create(path).map_err(|e| Error::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            Some(Box::new(BufWriter::new(file)))
        }
        None => None,
    };
    let accuracy = evaluate(
        model,
        instances,
        mode,
        writer.as_mut().map(|w| &mut **w as &mut dyn Write),
    )?;
    if let Some(mut w) = writer {
        w.flush().map_err(|e| Error::Io {
            path: report.map(Path::to_path_buf).unwrap_or_default(),
            source: e,
        })?;
    }
    Ok(accuracy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2c::model::ModelConfig;
    use l2c::system::SystemKind;

    #[test]
    fn report_file_is_written_and_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let model = ModelConfig::new(6, 2)
            .with_word_dim(3)
            .with_hidden_dim(3)
            .with_system(SystemKind::Constituent)
            .init::<EvalBackend>(&Default::default());
        let instances = vec![Instance {
            label: 1,
            sequences: vec![vec![2, 3, 4]],
            tree: None,
        }];
        let mode = PredictMode::Policy(PolicyKind::Left);

        let accuracy = score(&model, &instances, mode, Some(&path)).unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
        let report = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("gold: 1 pred: "));
        assert_eq!(lines[1], "((0 1) 2)");

        assert_eq!(score(&model, &instances, mode, None).unwrap(), accuracy);
    }
}
