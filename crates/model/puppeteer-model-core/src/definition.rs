//! Name-keyed, serializable views of a model: the full definition and the
//! live state. Both survive frames being reordered between save and load.

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::builder::ModelBuilder;
use crate::error::{ModelError, Result};
use crate::frame::{FrameId, VisualPrimitive};
use crate::joint::Joint;
use crate::model::KinematicModel;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDefinition {
    pub name: String,
    pub offset: [f64; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub joint: Joint,
    #[serde(default)]
    pub markers: Vec<MarkerDefinition>,
    #[serde(default)]
    pub visuals: Vec<VisualPrimitive>,
}

/// Model description exchanged with external loaders. Frame order is irrelevant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub name: String,
    pub frames: Vec<FrameDefinition>,
}

impl ModelDefinition {
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Live state keyed by variable name (`"<frame>.<dof>"`), in model order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub values: IndexMap<String, f64>,
}

impl KinematicModel {
    /// Build a model from a definition whose frames may appear in any order.
    pub fn from_definition(def: &ModelDefinition) -> Result<Self> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(def.frames.len());
        for (i, f) in def.frames.iter().enumerate() {
            if index.insert(f.name.as_str(), i).is_some() {
                return Err(ModelError::DuplicateFrame {
                    name: f.name.clone(),
                });
            }
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); def.frames.len()];
        let mut roots = Vec::new();
        for (i, f) in def.frames.iter().enumerate() {
            match &f.parent {
                None => roots.push(i),
                Some(parent) => {
                    let p = *index.get(parent.as_str()).ok_or_else(|| {
                        ModelError::UnknownParent {
                            frame: f.name.clone(),
                            parent: parent.clone(),
                        }
                    })?;
                    children[p].push(i);
                }
            }
        }
        if roots.len() != 1 {
            return Err(ModelError::RootCount { found: roots.len() });
        }

        // Depth-first preorder from the root, children in definition order.
        let root = roots[0];
        let root_def = &def.frames[root];
        let mut builder = ModelBuilder::new(root_def.name.clone(), root_def.joint.clone())?;
        let mut visited = HashSet::with_capacity(def.frames.len());
        visited.insert(root);
        add_attachments(&mut builder, FrameId::ROOT, root_def)?;

        let mut stack: Vec<(usize, FrameId)> = children[root]
            .iter()
            .rev()
            .map(|&c| (c, FrameId::ROOT))
            .collect();
        while let Some((i, parent)) = stack.pop() {
            if !visited.insert(i) {
                continue;
            }
            let f = &def.frames[i];
            let id = builder.add_frame(f.name.clone(), parent, f.joint.clone())?;
            add_attachments(&mut builder, id, f)?;
            stack.extend(children[i].iter().rev().map(|&c| (c, id)));
        }

        if let Some(orphan) = (0..def.frames.len()).find(|i| !visited.contains(i)) {
            return Err(ModelError::Cycle {
                frame: def.frames[orphan].name.clone(),
            });
        }
        builder.build()
    }

    /// Describe this model (including markers assigned since load).
    pub fn to_definition(&self, name: impl Into<String>) -> ModelDefinition {
        let frames = self
            .frames()
            .iter()
            .map(|f| FrameDefinition {
                name: f.name().to_string(),
                parent: f
                    .parent()
                    .map(|p| self.frames()[p.index()].name().to_string()),
                joint: f.joint().clone(),
                markers: f
                    .markers()
                    .iter()
                    .map(|m| MarkerDefinition {
                        name: m.name.clone(),
                        offset: [m.local.x, m.local.y, m.local.z],
                    })
                    .collect(),
                visuals: f.visuals().to_vec(),
            })
            .collect();
        ModelDefinition {
            name: name.into(),
            frames,
        }
    }

    pub fn snapshot_state(&self) -> StateSnapshot {
        StateSnapshot {
            values: self
                .variable_names()
                .iter()
                .cloned()
                .zip(self.state().iter().copied())
                .collect(),
        }
    }

    /// Restore a snapshot by name. Every model variable must be present and
    /// every snapshot entry must name a model variable; nothing is written otherwise.
    pub fn restore_state(&mut self, snapshot: &StateSnapshot) -> Result<()> {
        if let Some(unknown) = snapshot
            .values
            .keys()
            .find(|k| !self.variable_names().contains(k))
        {
            return Err(ModelError::UnknownVariable {
                name: unknown.clone(),
            });
        }

        let missing: Vec<&String> = self
            .variable_names()
            .iter()
            .filter(|n| !snapshot.values.contains_key(n.as_str()))
            .collect();
        if let Some(first) = missing.first() {
            return Err(ModelError::MissingVariables {
                expected: self.dof_count(),
                missing: missing.len(),
                first: (*first).clone(),
            });
        }

        let values: Vec<f64> = self
            .variable_names()
            .iter()
            .map(|n| snapshot.values[n.as_str()])
            .collect();
        self.set_state(&values)
    }
}

fn add_attachments(builder: &mut ModelBuilder, id: FrameId, f: &FrameDefinition) -> Result<()> {
    for m in &f.markers {
        builder.add_marker(id, m.name.clone(), Vector3::from(m.offset))?;
    }
    for v in &f.visuals {
        builder.add_visual(id, v.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::JointDof;

    fn frame(name: &str, parent: Option<&str>, joint: Joint) -> FrameDefinition {
        FrameDefinition {
            name: name.into(),
            parent: parent.map(Into::into),
            joint,
            markers: Vec::new(),
            visuals: Vec::new(),
        }
    }

    #[test]
    fn rejects_malformed_hierarchies() {
        let two_roots = ModelDefinition {
            name: "x".into(),
            frames: vec![frame("a", None, Joint::fixed()), frame("b", None, Joint::fixed())],
        };
        assert_eq!(
            KinematicModel::from_definition(&two_roots).unwrap_err(),
            ModelError::RootCount { found: 2 }
        );

        let cycle = ModelDefinition {
            name: "x".into(),
            frames: vec![
                frame("root", None, Joint::fixed()),
                frame("a", Some("b"), Joint::fixed()),
                frame("b", Some("a"), Joint::fixed()),
            ],
        };
        assert!(matches!(
            KinematicModel::from_definition(&cycle),
            Err(ModelError::Cycle { .. })
        ));

        let dangling = ModelDefinition {
            name: "x".into(),
            frames: vec![
                frame("root", None, Joint::fixed()),
                frame("a", Some("nowhere"), Joint::fixed()),
            ],
        };
        assert!(matches!(
            KinematicModel::from_definition(&dangling),
            Err(ModelError::UnknownParent { .. })
        ));
    }

    #[test]
    fn restore_is_all_or_nothing() {
        let def = ModelDefinition {
            name: "x".into(),
            frames: vec![
                frame("root", None, Joint::translation_xyz()),
                frame(
                    "knee",
                    Some("root"),
                    Joint::with_dofs(vec![JointDof::rotation([0.0, 1.0, 0.0])]),
                ),
            ],
        };
        let mut model = KinematicModel::from_definition(&def).unwrap();
        model.set_state(&[1.0, 2.0, 3.0, 0.5]).unwrap();
        let mut snap = model.snapshot_state();
        assert_eq!(snap.values["knee.RY"], 0.5);

        snap.values.shift_remove("root.TY");
        model.set_state(&[0.0; 4]).unwrap();
        assert!(matches!(
            model.restore_state(&snap),
            Err(ModelError::MissingVariables { missing: 1, .. })
        ));
        assert_eq!(model.state(), &[0.0; 4]);

        snap.values.insert("root.TY".into(), 2.0);
        snap.values.insert("ankle.RX".into(), 0.1);
        assert!(matches!(
            model.restore_state(&snap),
            Err(ModelError::UnknownVariable { .. })
        ));
        snap.values.shift_remove("ankle.RX");
        model.restore_state(&snap).unwrap();
        assert_eq!(model.state(), &[1.0, 2.0, 3.0, 0.5]);
    }
}
