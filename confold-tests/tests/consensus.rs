use anyhow::Result;
use lib_confold::{
    alignment::Alignment,
    context::FoldContext,
    evaluate::structure_energy,
    fold::{consensus_fold, fill_matrices, minimum_energy, ConsensusStructure},
    model::{BacktrackType, DangleModel, ModelConfig},
    structure::BasePair,
};

fn fold(sequences: &[&str], model: &ModelConfig) -> Result<ConsensusStructure> {
    let alignment = Alignment::new(sequences, model.circular)?;
    let context = FoldContext::new(&alignment, model)?;
    Ok(consensus_fold(&context)?)
}

/// The energy the fold reports must be reproducible by evaluating the
/// reported structure.
fn assert_consistent(sequences: &[&str], model: &ModelConfig) -> Result<()> {
    let alignment = Alignment::new(sequences, model.circular)?;
    let context = FoldContext::new(&alignment, model)?;
    let matrices = fill_matrices(&context);
    let total = minimum_energy(&context, &matrices);
    let result = consensus_fold(&context)?;
    let evaluated = structure_energy(&context, &result.structure)?;
    assert_eq!(
        evaluated.total(),
        total,
        "evaluating {} disagrees with the fold",
        result.structure,
    );

    let mut seen = vec![false; context.n() + 1];
    for pair in &result.pairs {
        assert!(pair.i <= pair.j);
        assert!(!seen[pair.i], "column {} is used twice", pair.i);
        seen[pair.i] = true;
        if !pair.is_tetrad() {
            assert!(!seen[pair.j], "column {} is used twice", pair.j);
            seen[pair.j] = true;
        }
    }
    Ok(())
}

#[test]
fn unpairable_alignments_stay_open() -> Result<()> {
    let result = fold(&["AGAAAAGGAA", "AAGAAAGAGA"], &ModelConfig::default())?;
    assert_eq!(result.structure, "..........");
    assert_eq!(result.energy, 0.0);
    assert_eq!(result.covariance, 0.0);
    Ok(())
}

#[test]
fn alignments_shorter_than_a_loop_stay_open() -> Result<()> {
    let result = fold(&["GAC", "GAC"], &ModelConfig::default())?;
    assert_eq!(result.structure, "...");
    assert_eq!(result.energy, 0.0);
    Ok(())
}

#[test]
fn single_helix_hairpin() -> Result<()> {
    let result = fold(&["GGGGAAACCCC"], &ModelConfig::default())?;
    assert_eq!(result.structure, "((((...))))");
    // hairpin 5.40 plus three GC stacks of -3.30 each
    assert_eq!(result.energy, -4.5);
    assert_eq!(result.covariance, 0.0);
    Ok(())
}

#[test]
fn duplicated_rows_leave_the_per_sequence_energy_unchanged() -> Result<()> {
    let single = fold(&["GGGGAAACCCC"], &ModelConfig::default())?;
    let double = fold(&["GGGGAAACCCC", "GGGGAAACCCC"], &ModelConfig::default())?;
    assert_eq!(single.structure, double.structure);
    assert_eq!(single.energy, double.energy);
    Ok(())
}

#[test]
fn folding_is_idempotent() -> Result<()> {
    let model = ModelConfig::default();
    let first = fold(&["GGCGAAACGCC", "GGCGAAACGCC"], &model)?;
    let second = fold(&["GGCGAAACGCC", "GGCGAAACGCC"], &model)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn compensatory_substitutions_lower_the_reported_energy() -> Result<()> {
    let conserved = fold(&["GGGGAAACCCC", "GGGGAAACCCC"], &ModelConfig::default())?;
    let compensatory = fold(&["GGGGAAACCCC", "CCGGAAACCGG"], &ModelConfig::default())?;
    assert!(compensatory.covariance > 0.0);
    assert!(compensatory.energy < conserved.energy + compensatory.covariance);
    Ok(())
}

#[test]
fn fold_and_evaluator_agree() -> Result<()> {
    let alignments: [&[&str]; 4] = [
        &["GGGGAAACCCC"],
        &["GGCGAAACGCC", "GGUGAAACACC"],
        &["GGGAAAUC-CC", "GG-AAAUCCCC"],
        &["GGGGAAACCCCAAAGGGGAAACCCC"],
    ];
    for sequences in alignments {
        assert_consistent(sequences, &ModelConfig::default())?;
        assert_consistent(
            sequences,
            &ModelConfig {
                dangles: DangleModel::None,
                ..ModelConfig::default()
            },
        )?;
        assert_consistent(
            sequences,
            &ModelConfig {
                no_lonely_pairs: true,
                ..ModelConfig::default()
            },
        )?;
        assert_consistent(
            sequences,
            &ModelConfig {
                quadruplex: true,
                ..ModelConfig::default()
            },
        )?;
    }
    Ok(())
}

#[test]
fn fold_and_evaluator_agree_on_forced_interpretations() -> Result<()> {
    assert_consistent(
        &["GGGGAAACCCC"],
        &ModelConfig {
            backtrack_type: BacktrackType::ClosingPair,
            ..ModelConfig::default()
        },
    )?;
    assert_consistent(
        &["GGGGAAACCCC", "GGGGAAACCCC"],
        &ModelConfig {
            backtrack_type: BacktrackType::Fragment,
            ..ModelConfig::default()
        },
    )?;
    Ok(())
}

#[test]
fn quadruplex_round_trip() -> Result<()> {
    let model = ModelConfig {
        quadruplex: true,
        ..ModelConfig::default()
    };
    let result = fold(&["AAGGAGGAGGAGGAA"], &model)?;
    assert_eq!(result.structure, "..++.++.++.++..");
    // two tetrads, three single-column linkers
    assert_eq!(result.energy, -18.0);
    assert_eq!(result.covariance, 0.0);
    assert_consistent(&["AAGGAGGAGGAGGAA"], &model)?;

    // without the motif decomposition nothing here can pair at all
    let plain = fold(&["AAGGAGGAGGAGGAA"], &ModelConfig::default())?;
    assert_eq!(plain.energy, 0.0);
    assert!(plain.energy > result.energy);
    Ok(())
}

#[test]
fn quadruplex_tetrad_mismatches_count_as_covariance() -> Result<()> {
    let model = ModelConfig {
        quadruplex: true,
        ..ModelConfig::default()
    };
    let sequences = ["AAGGAGGAGGAGGAA", "AAAGAGGAGGAGGAA"];
    let result = fold(&sequences, &model)?;
    assert_eq!(result.structure, "..++.++.++.++..");
    assert_eq!(result.energy, -16.5);
    assert_eq!(result.covariance, -1.5);
    assert_consistent(&sequences, &model)?;
    Ok(())
}

#[test]
fn quadruplex_inside_a_host_pair() -> Result<()> {
    let model = ModelConfig {
        quadruplex: true,
        ..ModelConfig::default()
    };
    // a G-C helix can close around the motif, paying the host-loop term for
    // the one and two unpaired columns next to the pair
    let sequences = ["GGGGAGGAGGAGGAGGAACCCC"];
    let result = fold(&sequences, &model)?;
    assert_eq!(result.structure, "((((.++.++.++.++..))))");
    // four stacked pairs, the motif and the length-3 host loop
    assert_eq!(result.energy, -26.9);
    assert_consistent(&sequences, &model)?;
    Ok(())
}

#[test]
fn quadruplex_inside_a_multiloop() -> Result<()> {
    let model = ModelConfig {
        quadruplex: true,
        ..ModelConfig::default()
    };
    // a hairpin branch next to the motif forces the closing pair to
    // decompose as a multiloop with a quadruplex stem
    let sequences = ["GGGGGGGAAACCCCAGGAGGAGGAGGACCC"];
    let result = fold(&sequences, &model)?;
    assert_eq!(result.structure, "(((((((...)))).++.++.++.++.)))");
    assert_eq!(result.energy, -28.1);
    assert_consistent(&sequences, &model)?;
    Ok(())
}

#[test]
fn lonely_pairs_are_suppressed() -> Result<()> {
    let model = ModelConfig {
        no_lonely_pairs: true,
        ..ModelConfig::default()
    };
    // only a single isolated pair is possible
    let result = fold(&["GAAAC"], &model)?;
    assert_eq!(result.structure, ".....");
    assert_eq!(result.energy, 0.0);
    Ok(())
}

#[test]
fn hard_constraints_forbid_and_force_pairs() -> Result<()> {
    let sequences = ["GGGGAAACCCC"];
    let alignment = Alignment::new(&sequences, false)?;
    let model = ModelConfig::default();

    let mut context = FoldContext::new(&alignment, &model)?;
    context.constrain("x..........")?;
    let constrained = consensus_fold(&context)?;
    assert!(constrained
        .pairs
        .iter()
        .all(|pair| pair.i != 1 && pair.j != 1));
    let free = fold(&sequences, &model)?;
    assert!(constrained.energy > free.energy);

    let mut context = FoldContext::new(&alignment, &model)?;
    context.constrain("(.........)")?;
    let forced = consensus_fold(&context)?;
    assert!(forced.pairs.contains(&BasePair { i: 1, j: 11 }));
    Ok(())
}

#[test]
fn circular_folds_pay_for_the_wrap_loop() -> Result<()> {
    let sequences = ["AAGGGGGAAACCCCCAA"];
    let circular = fold(
        &sequences,
        &ModelConfig {
            circular: true,
            ..ModelConfig::default()
        },
    )?;
    assert_eq!(circular.structure, "..(((((...)))))..");
    // the four unpaired wrap columns form a hairpin-like exterior loop
    assert_eq!(circular.energy, -3.0);

    let linear = fold(&sequences, &ModelConfig::default())?;
    assert_eq!(linear.structure, circular.structure);
    assert!(linear.energy < circular.energy);
    Ok(())
}

#[test]
fn circular_unpairable_alignments_stay_open() -> Result<()> {
    let result = fold(
        &["AGAAAAGGAA"],
        &ModelConfig {
            circular: true,
            ..ModelConfig::default()
        },
    )?;
    assert_eq!(result.structure, "..........");
    assert_eq!(result.energy, 0.0);
    Ok(())
}
