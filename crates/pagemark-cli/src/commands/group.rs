//! Group command handlers

use anyhow::Result;
use clap::Args;

use pagemark_core::{
    AvailableFor, EntityKind, Group, GroupItem, GroupPair, GroupService, StoreHandle,
};

use super::{parse_available_for, parse_item, parse_pair};
use crate::output::Output;
use crate::prompt::confirm;

/// Fields accepted by `group add`
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Group key, e.g. STATUS
    pub key: String,
    /// Display name
    pub name: String,
    /// Entity kinds that may carry it: bookmark, page or both
    #[arg(long = "for", value_parser = parse_available_for, default_value = "both")]
    pub available_for: AvailableFor,
    /// Allow more than one item per entity
    #[arg(long)]
    pub multi: bool,
    /// Only offer this group to entities carrying GROUP/ITEM, repeatable
    #[arg(long = "requires", value_parser = parse_pair)]
    pub requires: Vec<GroupPair>,
    /// Item as KEY=NAME, repeatable
    #[arg(short, long = "item", value_parser = parse_item)]
    pub items: Vec<GroupItem>,
}

/// Fields accepted by `group edit`; omitted flags keep current values
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// New display name
    #[arg(long)]
    pub name: Option<String>,
    /// Entity kinds that may carry it: bookmark, page or both
    #[arg(long = "for", value_parser = parse_available_for)]
    pub available_for: Option<AvailableFor>,
    /// Allow more than one item per entity
    #[arg(long)]
    pub multi: Option<bool>,
    /// Replace the availability condition (GROUP/ITEM)
    #[arg(long = "requires", value_parser = parse_pair)]
    pub requires: Option<Vec<GroupPair>>,
    /// Drop the availability condition
    #[arg(long, conflicts_with = "requires")]
    pub unconditional: bool,
    /// Add or rename an item (KEY=NAME), repeatable
    #[arg(short, long = "item", value_parser = parse_item)]
    pub items: Vec<GroupItem>,
    /// Remove an item by key, repeatable
    #[arg(short, long = "remove-item")]
    pub remove_items: Vec<String>,
}

impl EditArgs {
    fn apply(self, group: &mut Group) {
        if let Some(name) = self.name {
            group.group_name = name;
        }
        if let Some(available_for) = self.available_for {
            group.available_for = available_for;
        }
        if let Some(multi) = self.multi {
            group.multi = multi;
        }
        if self.unconditional {
            group.available_condition = None;
        } else if let Some(requires) = self.requires {
            group.available_condition = Some(requires);
        }
        group
            .items
            .retain(|item| !self.remove_items.contains(&item.item_key_path));
        for item in self.items {
            match group
                .items
                .iter_mut()
                .find(|i| i.item_key_path == item.item_key_path)
            {
                Some(existing) => existing.item_name = item.item_name,
                None => group.items.push(item),
            }
        }
    }
}

/// List groups
///
/// With `kind`, lists only groups an entity of that kind carrying
/// `carrying` may select.
pub fn list(
    store: &StoreHandle,
    kind: Option<EntityKind>,
    carrying: &[GroupPair],
    output: &Output,
) -> Result<()> {
    let service = GroupService::new(store);
    let groups = match kind {
        Some(kind) => service.available_groups(kind, carrying)?,
        None => service.get_groups()?,
    };

    output.print_groups(&groups);
    Ok(())
}

/// Create a group
pub fn add(store: &StoreHandle, args: AddArgs, output: &Output) -> Result<()> {
    let group = Group {
        group_key_path: args.key,
        group_name: args.name,
        available_for: args.available_for,
        multi: args.multi,
        available_condition: (!args.requires.is_empty()).then_some(args.requires),
        items: args.items,
    };

    let group = GroupService::new(store).add_group(group)?;

    output.success(&format!("Created group: {}", group.group_key_path));
    output.print_groups(std::slice::from_ref(&group));
    Ok(())
}

/// Edit a group's name, flags or items
pub fn edit(store: &StoreHandle, key: &str, args: EditArgs, output: &Output) -> Result<()> {
    let service = GroupService::new(store);
    let mut group = service.get_group(key)?;

    args.apply(&mut group);
    let group = service.update_group(group)?;

    output.success(&format!("Updated group: {}", group.group_key_path));
    output.print_groups(std::slice::from_ref(&group));
    Ok(())
}

/// Delete an unreferenced group
pub fn delete(store: &StoreHandle, key: &str, output: &Output) -> Result<()> {
    let service = GroupService::new(store);

    if output.should_prompt() {
        let group = service.get_group(key)?;
        println!(
            "Delete group: {} - {} ({} item(s))",
            group.group_key_path,
            group.group_name,
            group.items.len()
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let group = service.delete_group(key)?;

    output.success(&format!("Deleted group: {}", group.group_key_path));
    Ok(())
}
