//! Skill card command handlers

use anyhow::{bail, Result};
use clap::Args;

use folio_core::{ContentApi, ContentEditor, Skill, SkillList};

use crate::commands::report_save;
use crate::output::Output;

/// Fields of a new skill card
#[derive(Args, Debug, Clone)]
pub struct NewSkill {
    /// Skill title
    pub title: String,
    /// Short description
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Icon class (e.g. fa-code)
    #[arg(short, long)]
    pub icon: Option<String>,
    /// Icon color
    #[arg(long)]
    pub color: Option<String>,
    /// Proficiency from 0 to 100
    #[arg(short, long)]
    pub level: Option<u8>,
    /// Card background image URL
    #[arg(long)]
    pub image: Option<String>,
    /// "Learn more" link
    #[arg(long)]
    pub link: Option<String>,
}

impl NewSkill {
    fn into_skill(self) -> Skill {
        let mut skill = Skill::new(self.title, self.description);
        if let Some(icon) = self.icon {
            skill.icon = icon;
        }
        if let Some(color) = self.color {
            skill.icon_color = color;
        }
        if let Some(level) = self.level {
            skill.set_proficiency(level);
        }
        skill.background_image = self.image;
        skill.learn_more_link = self.link;
        skill
    }
}

pub async fn list<A: ContentApi>(editor: &ContentEditor<A>, output: &Output) -> Result<()> {
    let loaded = editor.current::<SkillList>().await;
    output.print_skills(&loaded);
    Ok(())
}

/// Append a skill card
pub async fn add<A: ContentApi>(
    editor: &ContentEditor<A>,
    new: NewSkill,
    output: &Output,
) -> Result<()> {
    let skill = new.into_skill();
    let id = skill.id.clone();
    let title = skill.title.clone();

    let outcome = editor
        .update::<SkillList, _>(move |skills| skills.0.push(skill))
        .await;
    report_save(outcome, &format!("Added skill '{}' ({})", title, id), output)
}

pub async fn remove<A: ContentApi>(
    editor: &ContentEditor<A>,
    id: String,
    output: &Output,
) -> Result<()> {
    let mut skills = editor.current::<SkillList>().await.doc;
    if !skills.remove(&id) {
        bail!("Skill not found: {}", id);
    }

    let outcome = editor.save(&skills).await;
    report_save(outcome, &format!("Removed skill {}", id), output)
}
