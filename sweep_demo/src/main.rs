//! Sweep Demo
//!
//! Builds an OBB tree over a mesh and fires randomly placed, randomly
//! oriented boxes at it, logging what the swept queries report.
//!
//! Usage: `sweep_demo [--mesh level.obj] [--config collision.toml] [--sweeps N] [--seed N]`
//!
//! Without `--mesh` a procedural terrain of hills is used.

use rand::prelude::*;
use std::f32::consts::TAU;
use sweep_engine::foundation::logging::{self, LevelFilter};
use sweep_engine::prelude::*;
use thiserror::Error;

const DEFAULT_SWEEPS: usize = 1000;
const TERRAIN_CELLS: usize = 32;
const TERRAIN_SIZE: f32 = 64.0;
const MIN_SPAWN_EXTENT: f32 = 1.0;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Mesh loading failed: {0}")]
    Mesh(#[from] ObjError),
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid arguments: {0}")]
    Arguments(String),
}

struct Options {
    mesh: Option<String>,
    config: Option<String>,
    sweeps: usize,
    seed: Option<u64>,
}

impl Options {
    fn parse() -> Result<Self, DemoError> {
        let mut options = Self { mesh: None, config: None, sweeps: DEFAULT_SWEEPS, seed: None };
        let mut args = std::env::args().skip(1);

        while let Some(flag) = args.next() {
            let mut value = || args.next().ok_or_else(|| DemoError::Arguments(format!("{flag} needs a value")));
            match flag.as_str() {
                "--mesh" => options.mesh = Some(value()?),
                "--config" => options.config = Some(value()?),
                "--sweeps" => {
                    let text = value()?;
                    options.sweeps = text
                        .parse()
                        .map_err(|_| DemoError::Arguments(format!("--sweeps expects a count, got '{text}'")))?;
                }
                "--seed" => {
                    let text = value()?;
                    options.seed = Some(
                        text.parse()
                            .map_err(|_| DemoError::Arguments(format!("--seed expects an integer, got '{text}'")))?,
                    );
                }
                other => return Err(DemoError::Arguments(format!("unknown argument '{other}'"))),
            }
        }
        Ok(options)
    }
}

/// Rolling hills on a grid, two triangles per cell
fn terrain() -> Vec<Triangle> {
    let cell = TERRAIN_SIZE / TERRAIN_CELLS as f32;
    let half = TERRAIN_SIZE * 0.5;
    let height = |i: usize, j: usize| {
        let x = i as f32 * cell - half;
        let z = j as f32 * cell - half;
        Vec3::new(x, (x * 0.2).sin() * 2.0 + (z * 0.15).cos() * 1.5, z)
    };

    let mut triangles = Vec::with_capacity(TERRAIN_CELLS * TERRAIN_CELLS * 2);
    for i in 0..TERRAIN_CELLS {
        for j in 0..TERRAIN_CELLS {
            let a = height(i, j);
            let b = height(i + 1, j);
            let c = height(i + 1, j + 1);
            let d = height(i, j + 1);
            triangles.push(Triangle::new(a, c, b));
            triangles.push(Triangle::new(a, d, c));
        }
    }
    triangles
}

/// Center and half-width of the area boxes are spawned over
///
/// A mesh collapsed to a point still gets some room.
fn spawn_region(tree: &ObbTree) -> (Vec3, f32) {
    let (origin, extent) = tree
        .nodes()
        .first()
        .map_or((Vec3::zeros(), TERRAIN_SIZE * 0.5), |root| (root.center, root.half_dimensions.max()));
    (origin, extent.max(MIN_SPAWN_EXTENT))
}

fn random_box(rng: &mut StdRng, origin: &Vec3, extent: f32) -> OrientedBox {
    let center = origin
        + Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-2.0..10.0),
            rng.gen_range(-extent..extent),
        );
    let orientation = Quat::from_euler_angles(
        rng.gen_range(0.0..TAU),
        rng.gen_range(0.0..TAU),
        rng.gen_range(0.0..TAU),
    );
    let dimensions = Vec3::new(rng.gen_range(0.2..3.0), rng.gen_range(0.2..3.0), rng.gen_range(0.2..3.0));
    OrientedBox::new(center, orientation, dimensions)
}

fn main() -> Result<(), DemoError> {
    logging::init(LevelFilter::Info);

    let options = Options::parse()?;

    let config = match &options.config {
        Some(path) => CollisionConfig::load_from_file(path)?,
        None => CollisionConfig::default(),
    };

    let triangles = match &options.mesh {
        Some(path) => ObjLoader::load_triangles(path)?,
        None => terrain(),
    };
    let triangle_count = triangles.len();

    let tree = ObbTree::build(triangles, config.tree);
    log::info!(
        "Built OBB tree over {} triangles: {} nodes, {} leaves, depth {}",
        triangle_count,
        tree.node_count(),
        tree.leaf_count(),
        tree.depth()
    );
    if tree.unconverged_fits() > 0 {
        log::warn!("{} node fits did not converge", tree.unconverged_fits());
    }

    let (origin, extent) = spawn_region(&tree);

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut trace = QueryTrace::new();
    let mut hits = 0usize;
    let mut earliest: Option<SweepHit> = None;
    let mut candidates = 0usize;

    for _ in 0..options.sweeps {
        let obb = random_box(&mut rng, &origin, extent);
        let displacement = Vec3::new(
            rng.gen_range(-4.0..4.0),
            rng.gen_range(-12.0..2.0),
            rng.gen_range(-4.0..4.0),
        );

        trace.clear();
        let hit = check_collision(&obb, &tree, &displacement, &config.sweep, Some(&mut trace));
        candidates += trace.candidates.len();

        if let Some(hit) = hit {
            hits += 1;
            log::debug!("Box at {:?} stopped at {:.4} against {:?}", obb.center, hit.portion, hit.normal);
            if earliest.map_or(true, |best| hit.portion < best.portion) {
                earliest = Some(hit);
            }
        }
    }

    log::info!(
        "{} of {} sweeps collided, {:.1} candidate triangles per query",
        hits,
        options.sweeps,
        candidates as f32 / options.sweeps.max(1) as f32
    );
    if let Some(hit) = earliest {
        log::info!("Earliest contact at portion {:.4}, normal {:?}", hit.portion, hit.normal);
    }

    let down_ray = Ray::new(origin + Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    match tree.intersect_ray(&down_ray) {
        Some(hit) => log::info!("Ray straight down hits triangle {} at {:?}", hit.triangle, hit.point),
        None => log::info!("Ray straight down misses the mesh"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_region_follows_mesh() {
        let offset = Vec3::new(100.0, 0.0, -40.0);
        let triangles = terrain()
            .into_iter()
            .map(|t| {
                let [a, b, c] = t.vertices();
                Triangle::new(a + offset, b + offset, c + offset)
            })
            .collect();
        let (origin, extent) = spawn_region(&ObbTree::new(triangles));

        assert!((origin - offset).norm() < 2.0);
        assert!(extent >= TERRAIN_SIZE * 0.5 - 1.0);
    }

    #[test]
    fn test_point_mesh_still_has_spawn_room() {
        let point = Vec3::new(3.0, 1.0, 2.0);
        let (origin, extent) = spawn_region(&ObbTree::new(vec![Triangle::new(point, point, point)]));

        assert!((origin - point).norm() < 1e-4);
        assert!(extent >= MIN_SPAWN_EXTENT);
        let mut rng = StdRng::seed_from_u64(7);
        let obb = random_box(&mut rng, &origin, extent);
        assert!((obb.center.x - point.x).abs() <= extent);
    }
}
