//! Consensus minimum-free-energy structure prediction for nucleotide
//! alignments.
//!
//! The fold minimizes the sum of a nearest-neighbor loop energy model over
//! all aligned sequences, rewarded by a covariance score for column pairs
//! with compensatory substitutions. Entry point is
//! [`fold::consensus_fold`] on a [`context::FoldContext`].

pub mod alignment;
pub mod backtrack;
pub mod constraints;
pub mod context;
pub mod covariance;
pub mod error;
pub mod evaluate;
pub mod fold;
pub mod gquad;
pub mod io;
pub mod matrices;
pub mod model;
pub mod params;
pub mod structure;
