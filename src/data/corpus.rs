//! Corpus readers.
//!
//! - sentences: `label<TAB>tok tok ..`
//! - trees: `label<TAB>tok tok ..<TAB>parent[:label] ..`
//! - pairs: JSON lines in the SNLI layout

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::Deserialize;

use super::tree::{parse_parent_list, GoldTree};
use super::vocab::Vocab;
use crate::error::{Error, Result};
use crate::system::{Action, SystemKind};

/// One labelled example.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    pub label: usize,
    /// Token ids, one sequence per sentence (two for pairs).
    pub sequences: Vec<Vec<usize>>,
    pub tree: Option<GoldTree>,
}

impl Instance {
    pub fn len(&self) -> usize {
        self.sequences.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_lines(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

fn parse_label(path: &Path, line: usize, field: &str) -> Result<usize> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::parse(path, line, format!("bad label '{field}'")))
}

fn tokenize(vocab: &mut Vocab, text: &str) -> Vec<usize> {
    text.split_whitespace().map(|t| vocab.lookup(t)).collect()
}

/// `label<TAB>tokens` per line.
pub fn read_sentences(path: &Path, vocab: &mut Vocab) -> Result<Vec<Instance>> {
    let text = read_lines(path)?;
    let mut instances = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((label, tokens)) = line.split_once('\t') else {
            return Err(Error::parse(path, i + 1, "expected label<TAB>tokens"));
        };
        let sequence = tokenize(vocab, tokens);
        if sequence.is_empty() {
            return Err(Error::parse(path, i + 1, "empty sentence"));
        }
        instances.push(Instance {
            label: parse_label(path, i + 1, label)?,
            sequences: vec![sequence],
            tree: None,
        });
    }
    log::info!("{}: {} sentences", path.display(), instances.len());
    Ok(instances)
}

/// `label<TAB>tokens<TAB>tree` per line; trees are validated against `system`.
pub fn read_trees(path: &Path, vocab: &mut Vocab, system: SystemKind) -> Result<Vec<Instance>> {
    let text = read_lines(path)?;
    let mut instances = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let [label, tokens, tree] = fields.as_slice() else {
            return Err(Error::parse(path, i + 1, "expected label<TAB>tokens<TAB>tree"));
        };
        let sequence = tokenize(vocab, tokens);
        if sequence.is_empty() {
            return Err(Error::parse(path, i + 1, "empty sentence"));
        }
        let tree = parse_parent_list(tree)
            .map_err(|msg| Error::parse(path, i + 1, msg))?
            .normalize(sequence.len(), system)
            .map_err(|e| Error::parse(path, i + 1, e.to_string()))?;
        instances.push(Instance {
            label: parse_label(path, i + 1, label)?,
            sequences: vec![sequence],
            tree: Some(tree),
        });
    }
    log::info!("{}: {} trees", path.display(), instances.len());
    Ok(instances)
}

#[derive(Deserialize)]
struct PairRecord {
    gold_label: String,
    sentence1_binary_parse: String,
    sentence2_binary_parse: String,
}

pub fn pair_label(name: &str) -> Option<usize> {
    match name {
        "neutral" => Some(0),
        "entailment" => Some(1),
        "contradiction" => Some(2),
        _ => None,
    }
}

fn unbracket(vocab: &mut Vocab, parse: &str) -> Vec<usize> {
    parse
        .split_whitespace()
        .filter(|t| *t != "(" && *t != ")")
        .map(|t| vocab.lookup(t))
        .collect()
}

/// Entailment pairs; records without a gold label are skipped.
pub fn read_pairs(path: &Path, vocab: &mut Vocab) -> Result<Vec<Instance>> {
    let text = read_lines(path)?;
    let mut instances = Vec::new();
    let mut skipped = 0usize;
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: PairRecord = serde_json::from_str(line)
            .map_err(|e| Error::parse(path, i + 1, e.to_string()))?;
        let Some(label) = pair_label(&record.gold_label) else {
            skipped += 1;
            continue;
        };
        let premise = unbracket(vocab, &record.sentence1_binary_parse);
        let hypothesis = unbracket(vocab, &record.sentence2_binary_parse);
        if premise.is_empty() || hypothesis.is_empty() {
            return Err(Error::parse(path, i + 1, "empty sentence"));
        }
        instances.push(Instance {
            label,
            sequences: vec![premise, hypothesis],
            tree: None,
        });
    }
    log::info!(
        "{}: {} pairs ({skipped} without gold label)",
        path.display(),
        instances.len()
    );
    Ok(instances)
}

/// Number of classes implied by the training labels.
pub fn n_classes(instances: &[Instance]) -> usize {
    instances.iter().map(|x| x.label + 1).max().unwrap_or(0)
}

/// Labels outside `0..n_classes` are an error naming the instance.
pub fn check_labels(path: &Path, instances: &[Instance], n_classes: usize) -> Result<()> {
    match instances.iter().position(|x| x.label >= n_classes) {
        Some(i) => Err(Error::LabelOutOfRange {
            path: path.to_path_buf(),
            instance: i + 1,
            label: instances[i].label,
            n_classes,
        }),
        None => Ok(()),
    }
}

/// Oracle action sequence of every instance's gold tree, in parallel.
pub fn oracle_sequences(instances: &[Instance], system: SystemKind) -> Result<Vec<Vec<Action>>> {
    let ts = system.transition_system();
    instances
        .par_iter()
        .map(|inst| {
            let tree = inst.tree.as_ref().ok_or(Error::MissingTree)?;
            ts.oracle_actions(&tree.parents)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_sentences() {
        let f = file("1\ta good film\n\n0\ta bad film\n");
        let mut vocab = Vocab::new();
        let data = read_sentences(f.path(), &mut vocab).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].sequences, vec![vec![2, 3, 4]]);
        assert_eq!(data[1].sequences, vec![vec![2, 5, 4]]);
        assert_eq!(n_classes(&data), 2);
    }

    #[test]
    fn sentence_errors_carry_line_numbers() {
        let f = file("1\tok\nnolabel\n");
        let err = read_sentences(f.path(), &mut Vocab::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
        let f = file("x\tok\n");
        assert!(read_sentences(f.path(), &mut Vocab::new()).is_err());
    }

    #[test]
    fn reads_constituent_trees() {
        let f = file("1\ta b c\t4 4 5 5:1 0:1\n");
        let mut vocab = Vocab::new();
        let data = read_trees(f.path(), &mut vocab, SystemKind::Constituent).unwrap();
        let tree = data[0].tree.as_ref().unwrap();
        assert_eq!(tree.parents.len(), 5);
        let oracles = oracle_sequences(&data, SystemKind::Constituent).unwrap();
        assert_eq!(oracles[0].len(), 5);
    }

    #[test]
    fn rejects_non_binary_tree_line() {
        let f = file("1\ta b c\t4 4 4 0 0\n");
        let err = read_trees(f.path(), &mut Vocab::new(), SystemKind::Constituent).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn reads_pairs_and_skips_unlabelled() {
        let f = file(concat!(
            r#"{"gold_label":"entailment","sentence1_binary_parse":"( a ( b c ) )","sentence2_binary_parse":"( a b )"}"#,
            "\n",
            r#"{"gold_label":"-","sentence1_binary_parse":"a","sentence2_binary_parse":"b"}"#,
            "\n"
        ));
        let mut vocab = Vocab::new();
        let data = read_pairs(f.path(), &mut vocab).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].label, 1);
        assert_eq!(data[0].sequences, vec![vec![2, 3, 4], vec![2, 3]]);
    }

    #[test]
    fn labels_checked_against_training_classes() {
        let data = vec![Instance {
            label: 4,
            sequences: vec![vec![2]],
            tree: None,
        }];
        assert!(matches!(
            check_labels(Path::new("dev"), &data, 3),
            Err(Error::LabelOutOfRange { instance: 1, label: 4, n_classes: 3, .. })
        ));
        assert!(check_labels(Path::new("dev"), &data, 5).is_ok());
    }

    #[test]
    fn label_errors_count_instances_not_lines() {
        let f = file("\n0\tfine\n\n\n1\tok\n7\ttoo high\n");
        let data = read_sentences(f.path(), &mut Vocab::new()).unwrap();
        let err = check_labels(f.path(), &data, 2).unwrap_err();
        assert!(matches!(err, Error::LabelOutOfRange { instance: 3, label: 7, .. }));
        assert!(err.to_string().contains("instance 3 has label 7"));
    }

    #[test]
    fn oracle_needs_trees() {
        let data = vec![Instance {
            label: 0,
            sequences: vec![vec![2]],
            tree: None,
        }];
        assert!(matches!(
            oracle_sequences(&data, SystemKind::Constituent),
            Err(Error::MissingTree)
        ));
    }
}
