use crate::*;

pub fn handle_auth_commands(cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<bool> {
    let Commands::Auth { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        AuthCommands::SignUp {
            email,
            password,
            nome_guerra,
            posto,
        } => {
            let info = sign_up(
                &LocalIdentity,
                ctx.store.as_mut(),
                &ctx.config,
                SignUpForm {
                    email,
                    password,
                    war_name: nome_guerra,
                    rank: posto,
                },
            )?;
            print_one(cli.json, info, |i| {
                format!(
                    "signed up {} ({} {}, {})",
                    i.email,
                    i.rank,
                    i.war_name,
                    i.role.as_str()
                )
            })?;
        }
        AuthCommands::SignIn { email, password } => {
            let info = sign_in(&LocalIdentity, ctx.store.as_ref(), email, password)?;
            print_one(cli.json, info, |i| {
                format!("signed in as {}\t{} {}", i.email, i.rank, i.war_name)
            })?;
        }
        AuthCommands::SignOut => {
            let cleared = sign_out()?;
            print_one(
                cli.json,
                serde_json::json!({ "signed_out": cleared }),
                |_| {
                    if cleared {
                        "signed out".to_string()
                    } else {
                        "no active session".to_string()
                    }
                },
            )?;
        }
        AuthCommands::Whoami => {
            let info = whoami(&ctx.session)?;
            print_one(cli.json, info, |i| {
                format!(
                    "{}\t{}\t{}\t{}",
                    i.uid,
                    i.email,
                    cell(&format!("{} {}", i.rank, i.war_name)),
                    i.role.as_str()
                )
            })?;
        }
    }

    Ok(true)
}

pub fn handle_fo_commands(cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<bool> {
    let Commands::Fo { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        FoCommands::Submit {
            kind,
            candidate,
            description,
        } => {
            let fo = submit(
                ctx.store.as_mut(),
                &ctx.session,
                Submission {
                    kind: FoKind::from(*kind),
                    candidate,
                    description,
                },
            )?;
            audit(
                "fo_submit",
                serde_json::json!({"fo": fo.id, "tipo": fo.doc.kind, "candidateId": fo.doc.candidate_id}),
            );
            print_one(cli.json, fo, |f| {
                format!(
                    "recorded {} {} for {}",
                    f.doc.kind.as_str(),
                    f.id,
                    f.doc.candidate_name
                )
            })?;
        }
        FoCommands::Suggest { query } => {
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

pub fn handle_judge_commands(cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<bool> {
    let Commands::Judge { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        JudgeCommands::List { filter } => {
            ctx.session.require_user()?;
            let pending = list_unjudged(ctx.store.as_ref(), filter.as_deref())?;
            print_out(cli.json, &pending, |f| {
                format!(
                    "{}\t{}\t{}\t{}",
                    f.id,
                    cell(&f.doc.candidate_name),
                    cell(&f.doc.description),
                    cell(&f.doc.issued_by)
                )
            })?;
        }
        JudgeCommands::Record { fo_id, punishment } => {
            let fo = judge(ctx.store.as_mut(), &ctx.session, fo_id, punishment)?;
            print_one(cli.json, fo, |f| {
                format!(
                    "judged {}\t{}\t{}",
                    f.id, f.doc.punishment, f.doc.judged_by
                )
            })?;
        }
    }

    Ok(true)
}

fn panel<T: Serialize>(view: StatView, data: T) -> StatPanel<T> {
    StatPanel {
        view: view.as_str(),
        next: view.next().as_str(),
        prev: view.prev().as_str(),
        data,
    }
}

fn tie_line<T: Serialize>(view: &TieView<T>, describe: impl Fn(&T) -> String) -> String {
    match &view.current {
        None => "no negative observations yet".to_string(),
        Some(current) if view.tied => format!(
            "{}\ttie {}/{}",
            describe(current),
            view.index + 1,
            view.total
        ),
        Some(current) => describe(current),
    }
}

pub fn handle_stats_commands(cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<bool> {
    let Commands::Stats { command } = &cli.command else {
        return Ok(false);
    };

    ctx.session.require_user()?;
    let book = StatsBook::load(ctx.store.as_ref())?;
    match command {
        StatsCommands::Counter { name } => {
            if name.trim().is_empty() {
                return Err(AppError::Validation("pick a candidate name".to_string()).into());
            }
            let tally = book.candidate(name);
            print_one(cli.json, panel(StatView::Counter, tally), |p| {
                format!(
                    "{}\tpositivo={}\tnegativo={}\tneutro={}",
                    p.data.name, p.data.positive, p.data.negative, p.data.neutral
                )
            })?;
        }
        StatsCommands::MostSanctioned { index } => {
            let view = book.most_sanctioned().view(*index);
            print_one(cli.json, panel(StatView::MostSanctioned, view), |p| {
                tie_line(&p.data, |t| format!("{}\tnegativo={}", t.name, t.negative))
            })?;
        }
        StatsCommands::TopIssuer { index } => {
            let view = book.top_issuers().view(*index);
            print_one(cli.json, panel(StatView::TopIssuer, view), |p| {
                tie_line(&p.data, |t| format!("{}\tnegativo={}", t.issued_by, t.negative))
            })?;
        }
        StatsCommands::Suggest { query } => {
            let names = book.suggest(query);
            print_out(cli.json, &names, |n| n.to_string())?;
        }
        StatsCommands::Summary => {
            let summary = book.summary(ctx.store.as_ref())?;
            print_one(cli.json, summary, |s| {
                let leaders: Vec<&str> = s.most_sanctioned.iter().map(|t| t.name.as_str()).collect();
                let issuers: Vec<&str> = s.top_issuers.iter().map(|t| t.issued_by.as_str()).collect();
                format!(
                    "observations={}\tcandidates={}\tmost_sanctioned={}\ttop_issuer={}",
                    s.observations,
                    s.candidates,
                    cell(&leaders.join(", ")),
                    cell(&issuers.join(", "))
                )
            })?;
        }
    }

    Ok(true)
}
