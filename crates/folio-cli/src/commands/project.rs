//! Project tile command handlers

use anyhow::{bail, Result};
use clap::Args;

use folio_core::{ContentApi, ContentEditor, Project, ProjectList};

use crate::commands::report_save;
use crate::output::Output;

/// Fields of a new project tile
#[derive(Args, Debug, Clone)]
pub struct NewProject {
    /// Project title
    pub title: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Tile image URL
    #[arg(short, long, default_value = "")]
    pub image: String,
    /// Footer text
    #[arg(long, default_value = "")]
    pub footer: String,
    /// Technology used (repeatable)
    #[arg(short, long = "tech")]
    pub technologies: Vec<String>,
    /// Stack summary
    #[arg(long, default_value = "")]
    pub stack: String,
    /// Link to the project
    #[arg(short, long, default_value = "")]
    pub url: String,
}

impl NewProject {
    fn into_project(self) -> Project {
        let mut project = Project::new(self.title);
        project.description = self.description;
        project.image_url = self.image;
        project.footer = self.footer;
        project.technologies = self.technologies;
        project.stack = self.stack;
        project.project_url = self.url;
        project
    }
}

pub async fn list<A: ContentApi>(editor: &ContentEditor<A>, output: &Output) -> Result<()> {
    let loaded = editor.current::<ProjectList>().await;
    output.print_projects(&loaded);
    Ok(())
}

pub async fn add<A: ContentApi>(
    editor: &ContentEditor<A>,
    new: NewProject,
    output: &Output,
) -> Result<()> {
    let project = new.into_project();
    let id = project.id.clone();
    let title = project.title.clone();

    let outcome = editor
        .update::<ProjectList, _>(move |projects| projects.0.push(project))
        .await;
    report_save(outcome, &format!("Added project '{}' ({})", title, id), output)
}

pub async fn remove<A: ContentApi>(
    editor: &ContentEditor<A>,
    id: String,
    output: &Output,
) -> Result<()> {
    let mut projects = editor.current::<ProjectList>().await.doc;
    if !projects.remove(&id) {
        bail!("Project not found: {}", id);
    }

    let outcome = editor.save(&projects).await;
    report_save(outcome, &format!("Removed project {}", id), output)
}
