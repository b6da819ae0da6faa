use crate::error::{AppError, AppResult};
use crate::store::library::Library;
use crate::store::position_index::PositionIndex;

/// Process-wide collection of libraries, keyed by unique name.
///
/// Purely in memory: constructed on start, dropped on shutdown. Dropping a
/// library cascades destruction of its documents, chunks and index.
#[derive(Default)]
pub struct Database {
    libraries: Vec<Library>,
    library_names: PositionIndex,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn get_library(&self, name: &str) -> AppResult<&Library> {
        let position = self.library_names.position(name).ok_or_else(|| {
            AppError::NotFound(format!("Library with name `{}` does not exist.", name))
        })?;
        Ok(&self.libraries[position])
    }

    pub fn get_library_mut(&mut self, name: &str) -> AppResult<&mut Library> {
        let position = self.library_names.position(name).ok_or_else(|| {
            AppError::NotFound(format!("Library with name `{}` does not exist.", name))
        })?;
        Ok(&mut self.libraries[position])
    }

    pub fn add_library(&mut self, library: Library) -> AppResult<()> {
        if self.library_names.contains(&library.name) {
            return Err(AppError::Duplicate(format!(
                "Library with name `{}` already exists. Please use a different name.",
                library.name
            )));
        }
        self.library_names
            .add(&library.name, self.libraries.len())?;
        self.libraries.push(library);
        Ok(())
    }

    /// Rename a library in place; both names are validated and the name index
    /// is rebuilt.
    pub fn update_library_name(&mut self, previous: &str, new: &str) -> AppResult<()> {
        let position = self.library_names.position(previous).ok_or_else(|| {
            AppError::NotFound(format!("Library with name `{}` does not exist.", previous))
        })?;
        if self.library_names.contains(new) {
            return Err(AppError::Duplicate(format!(
                "Library with name `{}` already exists. Please use a different name.",
                new
            )));
        }

        self.libraries[position].name = new.to_string();
        self.library_names
            .rebuild(&self.libraries, |l| l.name.as_str());
        Ok(())
    }

    pub fn remove_library(&mut self, name: &str) -> AppResult<()> {
        let position = self.library_names.position(name).ok_or_else(|| {
            AppError::NotFound(format!("Library with name `{}` does not exist.", name))
        })?;
        self.libraries.remove(position);
        self.library_names
            .remove(name, &self.libraries, |l| l.name.as_str())
    }
}
