// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Boundary wiring
//!

use crate::{BoundaryEdge, EdgeWiring, Error, Patch, PatchGrid, Scenario};

use actor::ActorGraph;
use tracing::debug;

/// Connects every interior edge of `patches` to the facing edge of its neighbour.
///
/// For each edge of each patch the out port `BND_<edge>` of the patch is connected to the in
/// port `BND_<opposite>` of the neighbour, so calling it on every rank with that rank's own
/// patches wires each direction of each interior edge exactly once. Domain edges are left
/// unconnected; the scenario decides their behaviour.
///
/// Returns the number of connections made.
///
/// # Errors
///
/// The first error of [`ActorGraph::connect_ports`], or [`Error::UnknownPatch`].
pub async fn connect_patches(
    graph: &mut ActorGraph,
    grid: &PatchGrid,
    scenario: &dyn Scenario,
    patches: &[Patch],
) -> Result<usize, Error> {
    let mut connections = 0;
    for patch in patches {
        for edge in BoundaryEdge::ALL {
            match grid.edge_wiring(*patch, edge, scenario)? {
                EdgeWiring::Neighbor(neighbor) => {
                    debug!("Connecting {} -> {} on {}.", patch, neighbor, edge);
                    graph
                        .connect_ports(
                            &patch.name(),
                            edge.port_name(),
                            &neighbor.name(),
                            edge.opposite().port_name(),
                        )
                        .await?;
                    connections += 1;
                }
                EdgeWiring::Boundary(kind) => {
                    debug!("{} edge {} is a {:?} boundary.", patch, edge, kind);
                }
            }
        }
    }
    Ok(connections)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{BoundaryType, GridConfig, UniformScenario};

    use actor::{Actor, ActorCell, GraphConfig, LocalCluster, Step};
    use tracing_test::traced_test;

    struct Quiet {
        cell: ActorCell,
    }

    impl Quiet {
        fn new(grid: &PatchGrid, patch: Patch) -> Self {
            let mut cell = ActorCell::new(patch.name());
            for edge in BoundaryEdge::ALL {
                if grid.is_interior(patch, edge) {
                    cell.out_port::<f32, 4>(edge.port_name()).unwrap();
                    cell.in_port::<f32, 4>(edge.port_name()).unwrap();
                }
            }
            Self { cell }
        }
    }

    impl Actor for Quiet {
        fn cell(&self) -> &ActorCell {
            &self.cell
        }

        fn act(&mut self) -> Result<Step, actor::Error> {
            Ok(Step::Terminate)
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_connects_both_directions_on_one_rank() {
        let grid = PatchGrid::new(&GridConfig::new(32, 16, 16)).unwrap();
        let transport = LocalCluster::create(1).pop().unwrap();
        let mut graph = ActorGraph::new(transport, GraphConfig::default());
        let patches: Vec<Patch> = grid.patches().collect();
        for patch in &patches {
            graph.add_actor(Quiet::new(&grid, *patch)).unwrap();
        }
        graph.synchronize_actors().await.unwrap();

        let scenario = UniformScenario(BoundaryType::Wall);
        let connections = connect_patches(&mut graph, &grid, &scenario, &patches)
            .await
            .unwrap();
        assert_eq!(connections, 2);
        assert!(logs_contain("Connecting patch-0-0 -> patch-1-0 on BND_RIGHT."));
        assert!(logs_contain("patch-0-0 edge BND_LEFT is a Wall boundary."));

        // Wiring twice hits the already bound ports.
        assert!(matches!(
            connect_patches(&mut graph, &grid, &scenario, &patches).await,
            Err(Error::Actor(actor::Error::AlreadyConnected(_)))
        ));
    }
}
