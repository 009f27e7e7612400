use uuid::Uuid;

use crate::app::domain::project::ProjectMeta;
use crate::app::infrastructure::error::{AppError, Result};

/// The list of projects and which one is active.
///
/// Pure bookkeeping: persisting the list and swapping the loaded state is
/// done by [`AppState`](crate::app::state::AppState).
#[derive(Debug, Clone, Default)]
pub struct ProjectList {
    projects: Vec<ProjectMeta>,
    active: Option<String>,
}

fn validated_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Project("project name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

impl ProjectList {
    /// Build from persisted metadata. An active id that is not in the list
    /// is replaced by the first project.
    pub fn new(projects: Vec<ProjectMeta>, active: Option<String>) -> Self {
        let mut list = Self { projects, active };
        let known = list
            .active
            .as_deref()
            .is_some_and(|id| list.contains(id));
        if !known {
            list.active = list.projects.first().map(|p| p.id.clone());
        }
        list
    }

    pub fn projects(&self) -> &[ProjectMeta] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.projects.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ProjectMeta> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Append a new, empty project with a fresh id. Does not activate it.
    pub fn create(&mut self, name: &str) -> Result<ProjectMeta> {
        let meta = ProjectMeta {
            id: Uuid::new_v4().to_string(),
            name: validated_name(name)?,
            screenshot_count: 0,
        };
        self.projects.push(meta.clone());
        Ok(meta)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<()> {
        let name = validated_name(name)?;
        let meta = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::Project(format!("unknown project '{}'", id)))?;
        meta.name = name;
        Ok(())
    }

    /// Remove a project. The last remaining project cannot be removed.
    /// When the active project is removed, its neighbour becomes active.
    pub fn remove(&mut self, id: &str) -> Result<ProjectMeta> {
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AppError::Project(format!("unknown project '{}'", id)))?;
        if self.projects.len() == 1 {
            return Err(AppError::Project(
                "cannot delete the only remaining project".to_string(),
            ));
        }
        let removed = self.projects.remove(index);
        if self.active.as_deref() == Some(id) {
            let next = index.min(self.projects.len() - 1);
            self.active = Some(self.projects[next].id.clone());
        }
        Ok(removed)
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if !self.contains(id) {
            return Err(AppError::Project(format!("unknown project '{}'", id)));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn set_screenshot_count(&mut self, id: &str, count: usize) {
        if let Some(meta) = self.projects.iter_mut().find(|p| p.id == id) {
            meta.screenshot_count = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(names: &[&str]) -> ProjectList {
        let mut list = ProjectList::default();
        for name in names {
            list.create(name).unwrap();
        }
        let first = list.projects()[0].id.clone();
        list.set_active(&first).unwrap();
        list
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let list = list_of(&["A", "B"]);
        assert_eq!(list.len(), 2);
        assert_ne!(list.projects()[0].id, list.projects()[1].id);
        assert_eq!(list.projects()[1].name, "B");
    }

    #[test]
    fn test_blank_names_rejected() {
        let mut list = list_of(&["A"]);
        assert!(list.create("   ").is_err());
        let id = list.projects()[0].id.clone();
        assert!(matches!(list.rename(&id, ""), Err(AppError::Project(_))));
        list.rename(&id, "  Launch  ").unwrap();
        assert_eq!(list.get(&id).unwrap().name, "Launch");
    }

    #[test]
    fn test_last_project_cannot_be_removed() {
        let mut list = list_of(&["Only"]);
        let id = list.projects()[0].id.clone();
        assert!(matches!(list.remove(&id), Err(AppError::Project(_))));
        assert_eq!(list.len(), 1);
        assert_eq!(list.active_id(), Some(id.as_str()));
    }

    #[test]
    fn test_removing_active_picks_neighbour() {
        let mut list = list_of(&["A", "B", "C"]);
        let ids: Vec<String> = list.projects().iter().map(|p| p.id.clone()).collect();
        list.set_active(&ids[2]).unwrap();
        list.remove(&ids[2]).unwrap();
        assert_eq!(list.active_id(), Some(ids[1].as_str()));

        list.remove(&ids[0]).unwrap();
        assert_eq!(list.active_id(), Some(ids[1].as_str()));
    }

    #[test]
    fn test_new_repairs_unknown_active() {
        let meta = ProjectMeta {
            id: "a".into(),
            name: "A".into(),
            screenshot_count: 3,
        };
        let list = ProjectList::new(vec![meta], Some("gone".into()));
        assert_eq!(list.active_id(), Some("a"));
        assert!(ProjectList::new(Vec::new(), None).active_id().is_none());
    }
}
