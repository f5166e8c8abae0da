use crate::direction::Direction;
use crate::error::{GenerationError, TemplateError};
use crate::generator::{generate_floor, FloorLayout, GeneratorConfig};
use crate::link::{DoorType, LinkType};
use crate::room::GridPos;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Values;
use std::collections::{BTreeMap, HashSet};

/// Static description of one kind of dungeon floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorTemplate {
    pub id: String,
    pub shape: FloorShape,
    #[serde(default)]
    pub carve: CarvePolicy,
    #[serde(default)]
    pub endpoints: Endpoints,
    pub door_types: Vec<DoorType>,
    /// Chance of opening each adjacent pair the carving left closed.
    #[serde(default)]
    pub loop_chance: f64,
}

impl FloorTemplate {
    pub fn new(id: impl Into<String>, shape: FloorShape) -> Self {
        FloorTemplate {
            id: id.into(),
            shape,
            carve: CarvePolicy::default(),
            endpoints: Endpoints::default(),
            door_types: vec![DoorType::PLAIN],
            loop_chance: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let cells = self.shape.cells(&self.id)?;
        if cells.is_empty() {
            return Err(TemplateError::EmptyShape(self.id.clone()));
        }
        if self.door_types.is_empty() {
            return Err(TemplateError::NoDoorTypes(self.id.clone()));
        }
        if !(0.0..=1.0).contains(&self.loop_chance) {
            return Err(TemplateError::InvalidLoopChance {
                template: self.id.clone(),
                chance: self.loop_chance,
            });
        }

        let cells = cells.into_iter().collect::<HashSet<_>>();
        let check = |(x, y): (i32, i32)| {
            if cells.contains(&GridPos::new(x, y)) {
                Ok(())
            } else {
                Err(TemplateError::CellOutsideShape {
                    template: self.id.clone(),
                    x,
                    y,
                })
            }
        };
        if let Endpoints::Fixed { start, end } = self.endpoints {
            check(start)?;
            check(end)?;
            if start == end {
                return Err(TemplateError::SameEndpoints {
                    template: self.id.clone(),
                    x: start.0,
                    y: start.1,
                });
            }
        }
        if let CarvePolicy::Fixed { links } = &self.carve {
            for link in links {
                check(link.from)?;
                let (x, y) = link.from;
                let target = link.direction.step(&GridPos::new(x, y));
                if !target.is_some_and(|target| cells.contains(&target)) {
                    return Err(TemplateError::LinkLeavesShape {
                        template: self.id.clone(),
                        x,
                        y,
                        direction: link.direction,
                    });
                }
                if !self.door_types.contains(&link.door) {
                    return Err(TemplateError::DoorNotAllowed {
                        template: self.id.clone(),
                        x,
                        y,
                        door: link.door,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Which grid cells hold a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FloorShape {
    Rectangle { width: u32, height: u32 },
    /// One string per row: `#` is a room cell, `.` is empty.
    Mask { rows: Vec<String> },
}

impl FloorShape {
    /// Room cells in row-major order.
    pub fn cells(&self, template: &str) -> Result<Vec<GridPos>, TemplateError> {
        let too_large = |width: u64, height: u64| TemplateError::ShapeTooLarge {
            template: template.to_string(),
            width,
            height,
        };
        match self {
            FloorShape::Rectangle { width, height } => {
                let (Ok(w), Ok(h)) = (i32::try_from(*width), i32::try_from(*height)) else {
                    return Err(too_large(u64::from(*width), u64::from(*height)));
                };
                Ok((0..h)
                    .flat_map(|y| (0..w).map(move |x| GridPos::new(x, y)))
                    .collect())
            }
            FloorShape::Mask { rows } => {
                let expected = rows.first().map_or(0, |row| row.chars().count());
                if i32::try_from(expected).is_err() || i32::try_from(rows.len()).is_err() {
                    return Err(too_large(expected as u64, rows.len() as u64));
                }
                let mut cells = Vec::new();
                for ((row_index, row), y) in rows.iter().enumerate().zip(0i32..) {
                    let width = row.chars().count();
                    if width != expected {
                        return Err(TemplateError::RaggedMask {
                            template: template.to_string(),
                            row: row_index,
                            width,
                            expected,
                        });
                    }
                    for (c, x) in row.chars().zip(0i32..) {
                        match c {
                            '#' => cells.push(GridPos::new(x, y)),
                            '.' => {}
                            found => {
                                return Err(TemplateError::UnknownMaskCell {
                                    template: template.to_string(),
                                    x,
                                    y,
                                    found,
                                })
                            }
                        }
                    }
                }
                Ok(cells)
            }
        }
    }
}

/// How passages are carved through the grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CarvePolicy {
    /// Depth-first walk that backs up at dead ends.
    #[default]
    Backtracking,
    /// Unbiased random walk, opening a passage on first entry to each room.
    RandomWalk,
    /// Minimum spanning tree over randomly weighted grid edges.
    SpanningTree,
    /// Passages listed by the template, applied in order.
    Fixed { links: Vec<FixedLink> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedLink {
    pub from: (i32, i32),
    pub direction: Direction,
    #[serde(default = "forward")]
    pub link: LinkType,
    #[serde(default)]
    pub door: DoorType,
}

fn forward() -> LinkType {
    LinkType::FORWARD
}

/// Where the start and end rooms go.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoints {
    /// The two ends of the longest carved path.
    #[default]
    LongestPath,
    Fixed { start: (i32, i32), end: (i32, i32) },
}

/// Read-only set of floor templates keyed by id, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, FloorTemplate>,
}

impl TemplateCatalog {
    /// Adds a template while the catalog is being loaded. Rejected templates
    /// are returned as errors and never enter the catalog.
    pub fn insert(&mut self, template: FloorTemplate) -> Result<(), TemplateError> {
        template.validate()?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&FloorTemplate> {
        self.templates.get(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> Values<'_, String, FloorTemplate> {
        self.templates.values()
    }

    pub fn generate(
        &self,
        id: &str,
        config: GeneratorConfig,
    ) -> Result<FloorLayout, GenerationError> {
        let template = self
            .get(id)
            .ok_or_else(|| GenerationError::UnknownTemplate(id.to_string()))?;
        generate_floor(template, config)
    }
}

impl TryFrom<Vec<FloorTemplate>> for TemplateCatalog {
    type Error = TemplateError;

    fn try_from(templates: Vec<FloorTemplate>) -> Result<Self, Self::Error> {
        let mut catalog = TemplateCatalog::default();
        for template in templates {
            catalog.insert(template)?;
        }
        Ok(catalog)
    }
}
