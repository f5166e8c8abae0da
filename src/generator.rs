use crate::carve::carve;
use crate::error::{GenerationError, ValidationFailure};
use crate::room_graph::RoomGraph;
use crate::template::FloorTemplate;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::mem;
use std::ops::Deref;
use std::sync::Arc;

pub struct GeneratorConfig {
    pub seed: Option<u64>, // Seed value for the attempt seed sequence
    pub max_attempts: u32, // Rejected attempts allowed before giving up on the floor
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            seed: None,
            max_attempts: 16,
        }
    }
}

/// A validated floor, frozen for the lifetime of the dungeon instance.
///
/// Cloning shares the same graph; only `&self` queries are reachable through
/// [`Deref`], so any number of threads may read it without locking.
#[derive(Debug, Clone)]
pub struct FloorLayout {
    template_id: Arc<str>,
    seed: u64,
    attempts: u32,
    graph: Arc<RoomGraph>,
}

impl FloorLayout {
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Seed of the attempt that produced this layout.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn graph(&self) -> &RoomGraph {
        &self.graph
    }
}

impl Deref for FloorLayout {
    type Target = RoomGraph;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

/// Progress of one floor generation.
///
/// `Empty → GridAllocated → Carving → Validating → Ready | Rejected`, and
/// `Rejected → GridAllocated` with a fresh seed until the attempt budget runs
/// out.
#[derive(Debug)]
pub enum GenerationState {
    Empty,
    GridAllocated { graph: RoomGraph, seed: u64 },
    Carving { graph: RoomGraph, seed: u64 },
    Validating { graph: RoomGraph, seed: u64 },
    Ready(FloorLayout),
    Rejected(ValidationFailure),
}

pub struct FloorGenerator<'a> {
    template: &'a FloorTemplate,
    max_attempts: u32,
    rng: StdRng,
    attempts: u32,
    state: GenerationState,
}

impl<'a> FloorGenerator<'a> {
    pub fn new(template: &'a FloorTemplate, config: GeneratorConfig) -> Result<Self, GenerationError> {
        template.validate()?;
        let rng: StdRng = config
            .seed
            .map(SeedableRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy);
        Ok(FloorGenerator {
            template,
            max_attempts: config.max_attempts.max(1),
            rng,
            attempts: 0,
            state: GenerationState::Empty,
        })
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Performs one transition. Returns the layout once the state is `Ready`.
    pub fn step(&mut self) -> Result<Option<FloorLayout>, GenerationError> {
        let state = mem::replace(&mut self.state, GenerationState::Empty);
        let (next, ret) = match self.advance(state) {
            Ok(next) => next,
            Err((state, err)) => {
                self.state = state;
                return Err(err);
            }
        };
        self.state = next;
        Ok(ret)
    }

    #[allow(clippy::type_complexity)]
    fn advance(
        &mut self,
        state: GenerationState,
    ) -> Result<(GenerationState, Option<FloorLayout>), (GenerationState, GenerationError)> {
        let next = match state {
            GenerationState::Empty => self.allocate().map_err(|err| (GenerationState::Empty, err))?,
            GenerationState::GridAllocated { graph, seed } => {
                GenerationState::Carving { graph, seed }
            }
            GenerationState::Carving { mut graph, seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                if let Err(err) = carve(&mut graph, self.template, &mut rng) {
                    return Err((GenerationState::Empty, err.into()));
                }
                log::trace!("floor {} attempt {}:\n{}", self.template.id, self.attempts, graph);
                GenerationState::Validating { graph, seed }
            }
            GenerationState::Validating { graph, seed } => match graph.validate() {
                Ok(()) => {
                    log::info!(
                        "floor {} generated with {} rooms after {} attempts",
                        self.template.id,
                        graph.len(),
                        self.attempts
                    );
                    let layout = FloorLayout {
                        template_id: Arc::from(self.template.id.as_str()),
                        seed,
                        attempts: self.attempts,
                        graph: Arc::new(graph),
                    };
                    return Ok((GenerationState::Ready(layout.clone()), Some(layout)));
                }
                Err(failure) => {
                    log::warn!(
                        "floor {} attempt {} rejected: {}",
                        self.template.id,
                        self.attempts,
                        failure
                    );
                    GenerationState::Rejected(failure)
                }
            },
            GenerationState::Ready(layout) => {
                return Ok((GenerationState::Ready(layout.clone()), Some(layout)))
            }
            GenerationState::Rejected(failure) => self
                .allocate()
                .map_err(|err| (GenerationState::Rejected(failure), err))?,
        };
        Ok((next, None))
    }

    /// Starts a new attempt, or fails with `Exhausted` once the budget is spent.
    fn allocate(&mut self) -> Result<GenerationState, GenerationError> {
        if self.attempts >= self.max_attempts {
            log::error!(
                "floor {} exhausted {} attempts",
                self.template.id,
                self.attempts
            );
            return Err(GenerationError::Exhausted {
                template: self.template.id.clone(),
                attempts: self.attempts,
            });
        }
        let cells = self.template.shape.cells(&self.template.id)?;
        let graph = RoomGraph::from_cells(cells)?;
        let seed = self.rng.next_u64();
        self.attempts += 1;
        log::debug!(
            "floor {} attempt {}/{} using seed {}",
            self.template.id,
            self.attempts,
            self.max_attempts,
            seed
        );
        Ok(GenerationState::GridAllocated { graph, seed })
    }

    /// Steps until the floor is ready or the attempt budget is spent.
    pub fn run(mut self) -> Result<FloorLayout, GenerationError> {
        loop {
            if let Some(layout) = self.step()? {
                return Ok(layout);
            }
        }
    }
}

/// Generates one floor from `template`, retrying rejected attempts with fresh
/// seeds. No layout is returned unless it passed validation.
pub fn generate_floor(
    template: &FloorTemplate,
    config: GeneratorConfig,
) -> Result<FloorLayout, GenerationError> {
    FloorGenerator::new(template, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomRole;
    use crate::template::{CarvePolicy, FloorShape};

    fn square(id: &str) -> FloorTemplate {
        FloorTemplate::new(
            id,
            FloorShape::Rectangle {
                width: 3,
                height: 3,
            },
        )
    }

    fn islands() -> FloorTemplate {
        FloorTemplate::new(
            "islands",
            FloorShape::Mask {
                rows: vec!["#.#".to_string()],
            },
        )
    }

    #[test]
    fn test_state_sequence() {
        let template = square("square");
        let mut generator = FloorGenerator::new(
            &template,
            GeneratorConfig {
                seed: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(generator.state(), GenerationState::Empty));

        assert!(generator.step().unwrap().is_none());
        assert!(matches!(generator.state(), GenerationState::GridAllocated { .. }));
        assert_eq!(generator.attempts(), 1);

        assert!(generator.step().unwrap().is_none());
        assert!(matches!(generator.state(), GenerationState::Carving { .. }));

        assert!(generator.step().unwrap().is_none());
        assert!(matches!(generator.state(), GenerationState::Validating { .. }));

        let layout = generator.step().unwrap().unwrap();
        assert!(matches!(generator.state(), GenerationState::Ready(_)));
        assert_eq!(layout.attempts(), 1);
        assert_eq!(layout.template_id(), "square");

        // Ready is terminal
        let again = generator.step().unwrap().unwrap();
        assert_eq!(again.seed(), layout.seed());
    }

    #[test]
    fn test_rejected_then_exhausted() {
        let template = islands();
        let mut generator = FloorGenerator::new(
            &template,
            GeneratorConfig {
                seed: Some(1),
                max_attempts: 2,
            },
        )
        .unwrap();
        for _ in 0..4 {
            assert!(generator.step().unwrap().is_none());
        }
        assert!(matches!(generator.state(), GenerationState::Rejected(_)));

        // retry allocates a fresh grid
        assert!(generator.step().unwrap().is_none());
        assert!(matches!(generator.state(), GenerationState::GridAllocated { .. }));
        assert_eq!(generator.attempts(), 2);
        for _ in 0..3 {
            assert!(generator.step().unwrap().is_none());
        }

        let err = generator.step().unwrap_err();
        assert_eq!(
            err,
            GenerationError::Exhausted {
                template: "islands".to_string(),
                attempts: 2,
            }
        );
        assert!(matches!(generator.state(), GenerationState::Rejected(_)));
        assert_eq!(generator.step().unwrap_err(), err);
    }

    #[test]
    fn test_every_restart_respects_budget() {
        let template = square("square");
        let mut generator = FloorGenerator::new(
            &template,
            GeneratorConfig {
                seed: Some(5),
                max_attempts: 1,
            },
        )
        .unwrap();
        generator.attempts = 1;
        let exhausted = GenerationError::Exhausted {
            template: "square".to_string(),
            attempts: 1,
        };
        // a restart from Empty, as after a failed carve, is bounded too
        assert_eq!(generator.step().unwrap_err(), exhausted);
        assert!(matches!(generator.state(), GenerationState::Empty));
        assert_eq!(generator.step().unwrap_err(), exhausted);
        assert_eq!(generator.attempts(), 1);
    }

    #[test]
    fn test_attempts_use_distinct_seeds() {
        let template = islands();
        let mut generator = FloorGenerator::new(
            &template,
            GeneratorConfig {
                seed: Some(7),
                max_attempts: 3,
            },
        )
        .unwrap();
        let mut seeds = Vec::new();
        while generator.step().is_ok() {
            if let GenerationState::GridAllocated { seed, .. } = generator.state() {
                seeds.push(*seed);
            }
        }
        assert_eq!(seeds.len(), 3);
        seeds.dedup();
        assert_eq!(seeds.len(), 3);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let template = square("square");
        let layout = generate_floor(
            &template,
            GeneratorConfig {
                seed: Some(2),
                max_attempts: 0,
            },
        )
        .unwrap();
        assert_eq!(layout.attempts(), 1);
    }

    #[test]
    fn test_invalid_template_fails_before_attempts() {
        let mut template = square("broken");
        template.door_types.clear();
        assert!(matches!(
            generate_floor(&template, GeneratorConfig::default()),
            Err(GenerationError::Template(_))
        ));
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut template = square("square");
        template.carve = CarvePolicy::SpanningTree;
        template.loop_chance = 0.25;
        let config = || GeneratorConfig {
            seed: Some(42),
            ..Default::default()
        };
        let a = generate_floor(&template, config()).unwrap();
        let b = generate_floor(&template, config()).unwrap();
        assert_eq!(a.seed(), b.seed());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_layout_is_read_only_view() {
        let template = square("square");
        let layout = generate_floor(
            &template,
            GeneratorConfig {
                seed: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        let shared = layout.clone();
        assert!(Arc::ptr_eq(&layout.graph, &shared.graph));
        assert_eq!(
            layout
                .rooms()
                .filter(|room| room.role() == RoomRole::Start)
                .count(),
            1
        );
        assert_eq!(layout.graph().validate(), Ok(()));
    }
}
