//! Post-load consistency checks.

use super::catalog::Catalog;
use super::model::CrossSection;
use crate::error::{ConsistencyError, SampledTable};

/// Check every sampled table and ion of `catalog`, reporting all problems.
///
/// Cross-section tables must be strictly increasing in frequency and start at
/// their edge threshold; collision grids must be strictly increasing in
/// energy; every ion must own at least one level.
pub fn validate(catalog: &Catalog) -> Result<(), Vec<ConsistencyError>> {
    let mut problems = Vec::new();

    for (i, edge) in catalog.photo_edges().iter().enumerate() {
        let ctx = Context {
            table: SampledTable::Photoionization,
            record: i,
            z: edge.z,
            stage: edge.stage,
        };
        check_cross_section(&ctx, edge.threshold, &edge.table, &mut problems);
    }

    for (i, edge) in catalog.inner_edges().iter().enumerate() {
        let ctx = Context {
            table: SampledTable::InnerShell,
            record: i,
            z: edge.z,
            stage: edge.stage,
        };
        check_cross_section(&ctx, edge.threshold, &edge.table, &mut problems);
    }

    for (i, coll) in catalog.collisions().iter().enumerate() {
        let ion = catalog
            .lines()
            .get(coll.line)
            .and_then(|line| catalog.ions().get(line.ion));
        let ctx = Context {
            table: SampledTable::Collision,
            record: i,
            z: ion.map_or(0, |ion| ion.z),
            stage: ion.map_or(0, |ion| ion.stage),
        };
        check_increasing(&ctx, &coll.energy, &mut problems);
    }

    for (i, ion) in catalog.ions().iter().enumerate() {
        if ion.n_levels() == 0 {
            problems.push(ConsistencyError::EmptyLevelRange {
                ion: i,
                z: ion.z,
                stage: ion.stage,
            });
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

struct Context {
    table: SampledTable,
    record: usize,
    z: u32,
    stage: u32,
}

fn check_cross_section(
    ctx: &Context,
    threshold: f64,
    table: &CrossSection,
    problems: &mut Vec<ConsistencyError>,
) {
    if let Some(&first) = table.frequency.first() {
        if first != threshold {
            problems.push(ConsistencyError::ThresholdMismatch {
                table: ctx.table,
                record: ctx.record,
                z: ctx.z,
                stage: ctx.stage,
                threshold,
                first,
            });
        }
    }
    check_increasing(ctx, &table.frequency, problems);
}

fn check_increasing(ctx: &Context, xs: &[f64], problems: &mut Vec<ConsistencyError>) {
    for (j, pair) in xs.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            problems.push(ConsistencyError::NonMonotonic {
                table: ctx.table,
                record: ctx.record,
                z: ctx.z,
                stage: ctx.stage,
                sample: j + 1,
                previous: pair[0],
                value: pair[1],
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::data::catalog::tests::{sample_catalog, sample_tables};
    use crate::data::catalog::Tables;
    use crate::data::model::{CollisionTable, InnerShellEdge, PhotoEdge, TransitionType};

    fn edge(threshold: f64, freqs: &[f64]) -> PhotoEdge {
        let samples: Vec<(f64, f64)> = freqs.iter().map(|&f| (f, 1e-18)).collect();
        PhotoEdge {
            ion: 0,
            z: 1,
            stage: 1,
            threshold,
            table: CrossSection::from_samples(&samples),
        }
    }

    #[test]
    fn monotonic_tables_pass() {
        let cat = sample_catalog(vec![edge(5.0, &[5.0, 6.0, 9.0]), edge(2.0, &[2.0, 3.0])]);
        assert_eq!(validate(&cat), Ok(()));
    }

    #[test]
    fn reports_every_independent_problem() {
        let cat = sample_catalog(vec![
            edge(5.0, &[5.0, 6.0, 9.0]),
            edge(2.0, &[2.0, 4.0, 3.0, 8.0]),
            edge(1.5, &[1.0, 2.0]),
        ]);
        let problems = validate(&cat).unwrap_err();
        assert_eq!(
            problems,
            vec![
                ConsistencyError::NonMonotonic {
                    table: SampledTable::Photoionization,
                    record: 1,
                    z: 1,
                    stage: 1,
                    sample: 2,
                    previous: 4.0,
                    value: 3.0,
                },
                ConsistencyError::ThresholdMismatch {
                    table: SampledTable::Photoionization,
                    record: 2,
                    z: 1,
                    stage: 1,
                    threshold: 1.5,
                    first: 1.0,
                },
            ]
        );
        assert_eq!(cat.problems(), problems.as_slice());
    }

    #[test]
    fn repeated_frequency_is_not_strictly_increasing() {
        let cat = sample_catalog(vec![edge(5.0, &[5.0, 5.0])]);
        let problems = validate(&cat).unwrap_err();
        assert!(matches!(
            problems[0],
            ConsistencyError::NonMonotonic { sample: 1, .. }
        ));
    }

    #[test]
    fn inner_shell_and_collision_tables_are_checked() {
        let mut tables = sample_tables();
        tables.inner_edges = vec![
            InnerShellEdge {
                element: 2,
                ion: 1,
                z: 6,
                stage: 4,
                shell_n: 1,
                shell_l: 0,
                threshold: 3.0,
                table: CrossSection::from_samples(&[(3.0, 2e-19), (6.0, 5e-20)]),
            },
            InnerShellEdge {
                element: 2,
                ion: 1,
                z: 6,
                stage: 4,
                shell_n: 2,
                shell_l: 1,
                threshold: 0.5,
                table: CrossSection::from_samples(&[(0.4, 1e-19), (0.8, 4e-20)]),
            },
        ];
        // Line 0 belongs to H I, so the bad grid is reported against z=1 stage=1.
        tables.collisions.push(CollisionTable {
            line: 0,
            transition: TransitionType::Forbidden,
            energy: vec![1.0, 3.0, 3.0],
            upsilon: vec![0.2, 0.3, 0.35],
        });
        let cat = Catalog::assemble(PathBuf::from("synthetic.dat"), tables);

        let problems = validate(&cat).unwrap_err();
        assert_eq!(
            problems,
            vec![
                ConsistencyError::ThresholdMismatch {
                    table: SampledTable::InnerShell,
                    record: 1,
                    z: 6,
                    stage: 4,
                    threshold: 0.5,
                    first: 0.4,
                },
                ConsistencyError::NonMonotonic {
                    table: SampledTable::Collision,
                    record: 1,
                    z: 1,
                    stage: 1,
                    sample: 2,
                    previous: 3.0,
                    value: 3.0,
                },
            ]
        );
        assert!(!cat.is_valid());
    }

    #[test]
    fn collision_on_second_ion_reports_its_charge_state() {
        let tables = Tables {
            collisions: vec![CollisionTable {
                line: 1,
                transition: TransitionType::Allowed,
                energy: vec![2.0, 1.0],
                upsilon: vec![0.1, 0.3],
            }],
            ..sample_tables()
        };
        let cat = Catalog::assemble(PathBuf::from("synthetic.dat"), tables);
        assert!(matches!(
            cat.problems(),
            [ConsistencyError::NonMonotonic {
                table: SampledTable::Collision,
                z: 6,
                stage: 4,
                sample: 1,
                ..
            }]
        ));
    }
}
