// Wires a patch grid over several ranks and exchanges one value across every interior edge

use actor::{Actor, ActorCell, ActorGraph, Error, GraphConfig, InPort, LocalCluster, OutPort, Step};
use futures::future::join_all;
use grid::{
    BlockDistribution, BoundaryEdge, BoundaryType, GridConfig, Patch, PatchGrid,
    UniformScenario, connect_patches,
};

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

type Received = Arc<Mutex<BTreeMap<String, Vec<(BoundaryEdge, u64)>>>>;

// Sends its row-major index through every interior edge, then waits for one value per edge.
struct PatchActor {
    cell: ActorCell,
    id: u64,
    edges: Vec<(BoundaryEdge, OutPort<u64, 2>, InPort<u64, 2>)>,
    sent: bool,
    received: Received,
}

impl PatchActor {
    fn new(grid: &PatchGrid, patch: Patch, received: Received) -> Result<Self, grid::Error> {
        let mut cell = ActorCell::new(patch.name());
        let mut edges = Vec::new();
        for edge in BoundaryEdge::ALL {
            if grid.is_interior(patch, edge) {
                let out = cell.out_port(edge.port_name())?;
                let input = cell.in_port(edge.port_name())?;
                edges.push((edge, out, input));
            }
        }
        Ok(Self {
            cell,
            id: grid.index_of(patch)? as u64,
            edges,
            sent: false,
            received,
        })
    }
}

impl Actor for PatchActor {
    fn cell(&self) -> &ActorCell {
        &self.cell
    }

    fn act(&mut self) -> Result<Step, Error> {
        if !self.sent {
            for (_, out, _) in &self.edges {
                out.write(self.id)?;
            }
            self.sent = true;
        }
        let mut received = self.received.lock().unwrap();
        let mine = received.entry(self.cell.name().to_owned()).or_default();
        for (edge, _, input) in &self.edges {
            if input.available() > 0 {
                mine.push((*edge, input.read()?));
            }
        }
        if mine.len() == self.edges.len() {
            Ok(Step::Terminate)
        } else {
            Ok(Step::Continue)
        }
    }
}

async fn exchange(world_size: usize, config: GridConfig) -> BTreeMap<String, Vec<(BoundaryEdge, u64)>> {
    let received = Received::default();
    let grid = PatchGrid::new(&config).unwrap();
    let tasks = LocalCluster::create(world_size).into_iter().map(|transport| {
        let received = received.clone();
        tokio::spawn(async move {
            let mut graph = ActorGraph::new(transport, GraphConfig::default());
            let distribution = BlockDistribution::new(grid, graph.world_size())?;
            let patches = distribution.local_patches(graph.rank());
            for patch in &patches {
                graph.add_actor(PatchActor::new(&grid, *patch, received.clone())?)?;
            }
            graph.synchronize_actors().await?;
            let scenario = UniformScenario(BoundaryType::Outflow);
            let connections =
                connect_patches(&mut graph, &grid, &scenario, &patches).await?;
            graph.barrier().await?;
            graph.run().await?;
            Ok::<_, grid::Error>(connections)
        })
    });
    let connections: usize = join_all(tasks)
        .await
        .into_iter()
        .map(|result| result.unwrap().unwrap())
        .sum();

    // Both directions of every interior edge.
    let interior = grid.actors_y() * (grid.actors_x() - 1)
        + grid.actors_x() * (grid.actors_y() - 1);
    assert_eq!(connections, 2 * interior);

    let received = received.lock().unwrap();
    received.clone()
}

#[tokio::test]
async fn test_two_by_two_over_two_ranks() {
    let received = exchange(2, GridConfig::new(32, 32, 16)).await;

    assert_eq!(received.len(), 4);
    let mut corner = received["patch-0-0"].clone();
    corner.sort();
    // Right neighbour is patch 1, top neighbour is patch 2.
    assert_eq!(corner, vec![(BoundaryEdge::Right, 1), (BoundaryEdge::Top, 2)]);

    let mut opposite = received["patch-1-1"].clone();
    opposite.sort();
    assert_eq!(opposite, vec![(BoundaryEdge::Left, 2), (BoundaryEdge::Bottom, 1)]);
}

#[tokio::test]
async fn test_strip_over_three_ranks() {
    let received = exchange(3, GridConfig::new(80, 16, 16)).await;

    assert_eq!(received.len(), 5);
    let mut middle = received["patch-2-0"].clone();
    middle.sort();
    assert_eq!(middle, vec![(BoundaryEdge::Left, 1), (BoundaryEdge::Right, 3)]);
    assert_eq!(received["patch-4-0"], vec![(BoundaryEdge::Left, 3)]);
}

#[tokio::test]
async fn test_invalid_grid_is_rejected() {
    assert!(matches!(
        PatchGrid::new(&GridConfig::new(30, 32, 16)),
        Err(grid::Error::InvalidConfig(_))
    ));
}
