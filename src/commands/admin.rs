use crate::*;

pub fn handle_candidate_commands(cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<bool> {
    let Commands::Candidates { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        CandidateCommands::Import { csv } => {
            ctx.session.require_admin(ctx.store.as_ref())?;
            let report = import_csv(ctx.store.as_mut(), csv)?;
            audit(
                "candidates_import",
                serde_json::json!({"file": csv.to_string_lossy(), "inserted": report.inserted}),
            );
            print_one(cli.json, report, |r| {
                format!(
                    "imported {} candidates ({} rows, {} batches)",
                    r.inserted, r.rows, r.batches
                )
            })?;
        }
        CandidateCommands::List => {
            ctx.session.require_user()?;
            let items: Vec<CandidateItem> = load_candidates(ctx.store.as_ref())?
                .iter()
                .map(to_item)
                .collect();
            print_out(cli.json, &items, |c| {
                format!("{}\t{}\t{}\t{}", c.id, c.name, c.kind, c.active)
            })?;
        }
        CandidateCommands::Suggest { query } => {
            ctx.session.require_user()?;
            let candidates = load_candidates(ctx.store.as_ref())?;
            let items: Vec<CandidateItem> = candidate_suggestions(&candidates, query)
                .into_iter()
                .map(to_item)
                .collect();
            print_out(cli.json, &items, |c| format!("{}\t{}", c.id, c.name))?;
        }
    }

    Ok(true)
}

pub fn handle_control_commands(cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<bool> {
    let Commands::Control { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        ControlCommands::Pending => {
            ctx.session.require_admin(ctx.store.as_ref())?;
            let pending = list_pending_control(ctx.store.as_ref())?;
            print_out(cli.json, &pending, |f| {
                format!(
                    "{}\t{}\t{}\t{}\t{}",
                    f.id,
                    cell(&f.doc.candidate_name),
                    cell(&f.doc.description),
                    cell(&f.doc.punishment),
                    cell(&f.doc.judged_by)
                )
            })?;
        }
        ControlCommands::Close { out_dir } => {
            let out_dir = match out_dir {
                Some(dir) => dir.clone(),
                None => ctx.config.out_dir()?,
            };
            let report = close_control(ctx.store.as_mut(), &ctx.session, Local::now(), &out_dir)?;
            print_one(cli.json, report, |r| {
                format!(
                    "closed {} with {} observations\t{}",
                    r.control_id, r.total_fos, r.pdf_path
                )
            })?;
        }
        ControlCommands::Resume { control_id } => {
            let report = resume_control(ctx.store.as_mut(), &ctx.session, control_id)?;
            print_one(cli.json, report, |r| {
                format!(
                    "resumed {}: marked {} now, {} in total",
                    r.control_id, r.marked_now, r.marked_total
                )
            })?;
        }
        ControlCommands::List => {
            ctx.session.require_admin(ctx.store.as_ref())?;
            let controls = list_controls(ctx.store.as_ref())?;
            print_out(cli.json, &controls, |c| {
                format!(
                    "{}\t{}\t{}\t{}\t{}",
                    c.control_id,
                    c.title,
                    c.total_fos,
                    c.created_by,
                    c.job_status.as_str()
                )
            })?;
        }
        ControlCommands::Download {
            control_id,
            out_dir,
        } => {
            let out_dir = match out_dir {
                Some(dir) => dir.clone(),
                None => ctx.config.out_dir()?,
            };
            let report = download_control(
                ctx.store.as_ref(),
                &ctx.session,
                control_id,
                Local::now(),
                &out_dir,
            )?;
            print_one(cli.json, report, |r| format!("wrote {}", r.pdf_path))?;
        }
    }

    Ok(true)
}

pub fn handle_user_commands(cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<bool> {
    let Commands::User { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        UserCommands::List => {
            let users = list_users(ctx.store.as_ref(), &ctx.session)?;
            print_out(cli.json, &users, |u| {
                format!(
                    "{}\t{}\t{}\t{}",
                    u.id,
                    u.doc.email,
                    u.doc.display_label(),
                    u.doc.role.as_str()
                )
            })?;
        }
        UserCommands::SetRole { email, role } => {
            let user = set_role(ctx.store.as_mut(), &ctx.session, email, *role)?;
            print_one(cli.json, user, |u| {
                format!("{} is now {}", u.doc.email, u.doc.role.as_str())
            })?;
        }
    }

    Ok(true)
}
