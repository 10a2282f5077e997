//! The generation loop.
//!
//! [`SearchEngine`] orchestrates one search:
//! initialization → selection → operators → repair → evaluation →
//! replacement → bookkeeping → termination check → repeat.

use super::checkpoint::Checkpoint;
use super::config::SearchConfig;
use super::state::{
    SearchResult, SearchState, SearchStatus, SearchSummary, Snapshot, TerminationReason,
};
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::individual::{Evaluation, Individual};
use crate::initializer::Initializer;
use crate::objective::{Objective, ObjectiveFn};
use crate::operator::{Arity, Operator, OperatorContext, Pipeline};
use crate::population::Population;
use crate::random::{create_rng, SearchRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

type Observer = Box<dyn FnMut(&Snapshot) + Send>;

/// A configured search over the genotypes of encoding `E`, scored by
/// objective function `F`.
///
/// # Usage
///
/// ```
/// use u_metadesign::encoding::{Bounds, BoundedVectorEncoding};
/// use u_metadesign::initializer::UniformVectorInitializer;
/// use u_metadesign::objective::{Direction, Objective};
/// use u_metadesign::operator::{GaussianMutation, Pipeline};
/// use u_metadesign::search::{SearchConfig, SearchEngine};
/// use u_metadesign::termination::Termination;
///
/// let bounds = Bounds::uniform(2, -5.0, 5.0).unwrap();
/// let objective = Objective::from_fn(
///     BoundedVectorEncoding::new(bounds.clone()),
///     Direction::Minimize,
///     |x: &Vec<f64>| Ok(x.iter().map(|v| v * v).sum()),
/// );
/// let mut engine = SearchEngine::new(
///     objective,
///     UniformVectorInitializer::new(bounds),
///     Pipeline::from_operator(GaussianMutation::new(0.3).unwrap()),
///     SearchConfig::default()
///         .with_population_size(20)
///         .with_termination(Termination::MaxGenerations(50))
///         .with_seed(42),
/// )
/// .unwrap();
///
/// let result = engine.run().unwrap();
/// assert!(result.objective < 1.0);
/// assert_eq!(result.summary.generations, 50);
/// ```
pub struct SearchEngine<E: Encoding, F> {
    objective: Objective<E, F>,
    initializer: Box<dyn Initializer<E::Genotype>>,
    pipeline: Pipeline<E::Genotype>,
    config: SearchConfig<E::Genotype>,
    offspring_count: usize,
    population: Population<E::Genotype>,
    state: SearchState<E::Genotype>,
    status: SearchStatus,
    rng: SearchRng,
    seed: u64,
    started: Option<Instant>,
    elapsed_before: Duration,
    cancel: Arc<AtomicBool>,
    observers: Vec<Observer>,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl<E, F> SearchEngine<E, F>
where
    E: Encoding,
    F: ObjectiveFn<E::Phenotype>,
{
    /// Validates the configuration and builds an engine.
    ///
    /// No objective evaluation happens here; the evaluation counter of
    /// `objective` is reset.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for an invalid configuration,
    /// [`Error::ArityMismatch`] for a pipeline that produces nothing.
    pub fn new(
        objective: Objective<E, F>,
        initializer: impl Initializer<E::Genotype> + 'static,
        pipeline: Pipeline<E::Genotype>,
        config: SearchConfig<E::Genotype>,
    ) -> Result<Self> {
        config.validate()?;
        if pipeline.arity().1 == Arity::Fixed(0) {
            return Err(Error::ArityMismatch {
                upstream: pipeline.name().to_string(),
                produced: "0".into(),
                downstream: "replacement".into(),
                consumed: "at least 1".into(),
            });
        }
        if !config.termination.is_bounded() {
            warn!(
                termination = ?config.termination,
                "termination may never fire; only cancellation will stop this search"
            );
        }

        #[cfg(feature = "parallel")]
        let pool = if config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .build()
                .map_err(|e| {
                    Error::Configuration(format!("cannot start {} workers: {e}", config.workers))
                })?;
            Some(pool)
        } else {
            None
        };
        #[cfg(not(feature = "parallel"))]
        if config.workers > 1 {
            warn!(
                workers = config.workers,
                "built without the `parallel` feature; evaluating on the calling thread"
            );
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        objective.reset_evaluations();
        Ok(Self {
            state: SearchState::new(objective.direction()),
            objective,
            initializer: Box::new(initializer),
            pipeline,
            offspring_count: config.effective_offspring_count(),
            config,
            population: Population::new(Vec::new()),
            status: SearchStatus::Uninitialized,
            rng: create_rng(seed),
            seed,
            started: None,
            elapsed_before: Duration::ZERO,
            cancel: Arc::new(AtomicBool::new(false)),
            observers: Vec::new(),
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Rebuilds an engine from a [`Checkpoint`].
    ///
    /// Objective, initializer, pipeline and configuration must be the ones
    /// the checkpointed engine used for the trajectory to match.
    pub fn resume(
        objective: Objective<E, F>,
        initializer: impl Initializer<E::Genotype> + 'static,
        pipeline: Pipeline<E::Genotype>,
        config: SearchConfig<E::Genotype>,
        checkpoint: Checkpoint<E::Genotype>,
    ) -> Result<Self> {
        if checkpoint.population.size() != config.population_size {
            return Err(Error::Configuration(format!(
                "checkpoint holds {} individuals, configuration expects {}",
                checkpoint.population.size(),
                config.population_size
            )));
        }
        let mut engine = Self::new(objective, initializer, pipeline, config)?;
        engine.objective.restore_evaluations(checkpoint.evaluations);
        engine.population = checkpoint.population;
        engine.state = checkpoint.state;
        engine.status = checkpoint.status;
        engine.rng = checkpoint.rng;
        engine.seed = checkpoint.seed;
        engine.elapsed_before = checkpoint.elapsed;
        engine.started = Some(Instant::now());
        info!(
            generation = engine.state.generation(),
            evaluations = checkpoint.evaluations,
            "resumed from checkpoint"
        );
        Ok(engine)
    }

    /// Shares an existing cancellation token.
    pub fn with_cancel(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = token;
        self
    }

    /// The cancellation token. Setting it stops the search at the next
    /// generation boundary with [`TerminationReason::StoppedExternally`].
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Registers a callback invoked with a [`Snapshot`] after
    /// initialization and after every generation.
    pub fn on_generation(&mut self, observer: impl FnMut(&Snapshot) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn population(&self) -> &Population<E::Genotype> {
        &self.population
    }

    pub fn state(&self) -> &SearchState<E::Genotype> {
        &self.state
    }

    pub fn objective(&self) -> &Objective<E, F> {
        &self.objective
    }

    pub fn config(&self) -> &SearchConfig<E::Genotype> {
        &self.config
    }

    /// The seed actually in use (drawn from the OS if none was configured).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Wall time spent on this search, including time before a resume.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_before + self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Current progress as a [`Snapshot`].
    pub fn snapshot(&self) -> Snapshot {
        let stats = self.population.fitness_stats();
        Snapshot {
            generation: self.state.generation(),
            evaluations: self.state.evaluations(),
            elapsed: self.state.elapsed(),
            best_fitness: self.state.best_fitness(),
            best_objective: self.state.best_objective(),
            mean_fitness: stats.map(|s| s.mean),
            worst_fitness: stats.map(|s| s.worst),
            population_size: self.population.size(),
        }
    }

    /// Builds and evaluates the initial population.
    ///
    /// User-supplied genotypes come first, the initializer fills the rest;
    /// every genotype is repaired before evaluation.
    #[instrument(skip(self), fields(seed = self.seed, population = self.config.population_size))]
    pub fn initialize(&mut self) -> Result<()> {
        if self.status != SearchStatus::Uninitialized {
            return Err(Error::State(format!(
                "initialize called while {:?}",
                self.status
            )));
        }
        self.started = Some(Instant::now());

        let encoding = self.objective.encoding();
        let mut genotypes: Vec<E::Genotype> = self
            .config
            .initial_population
            .iter()
            .cloned()
            .map(|g| encoding.repair(g))
            .collect();
        while genotypes.len() < self.config.population_size {
            let g = self.initializer.create(&mut self.rng);
            genotypes.push(encoding.repair(g));
        }

        let mut individuals: Vec<Individual<E::Genotype>> =
            genotypes.into_iter().map(Individual::new).collect();
        let evaluations = {
            let batch: Vec<&Individual<E::Genotype>> = individuals.iter().collect();
            self.evaluate_batch(&batch)
        };
        match evaluations {
            Ok(evaluations) => {
                for (ind, e) in individuals.iter_mut().zip(evaluations) {
                    ind.set_evaluation(e);
                }
            }
            Err(e) => return Err(self.fail(e, 0)),
        }

        for ind in &individuals {
            self.state.offer(ind);
        }
        self.population = Population::new(individuals);
        self.state.set_evaluations(self.objective.evaluations());
        self.state.set_elapsed(self.elapsed());
        self.state.record_best();
        self.publish();
        self.status = SearchStatus::Initialized;
        info!(
            evaluations = self.state.evaluations(),
            best = ?self.state.best_objective(),
            "population initialized"
        );
        Ok(())
    }

    /// Runs one generation and returns the new status.
    ///
    /// Cancellation and termination are checked first, so calling `step`
    /// on a search whose criterion already holds finishes it without
    /// spending evaluations.
    ///
    /// # Errors
    ///
    /// [`Error::State`] before initialization or after finishing. Any
    /// error raised while producing or evaluating offspring finishes the
    /// search with [`TerminationReason::Failed`]; the population is left as
    /// it was before the generation.
    pub fn step(&mut self) -> Result<SearchStatus> {
        match self.status {
            SearchStatus::Uninitialized => {
                return Err(Error::State("step called before initialize".into()))
            }
            SearchStatus::Finished(reason) => {
                return Err(Error::State(format!("search already finished: {reason}")))
            }
            SearchStatus::Initialized | SearchStatus::Running => {}
        }

        if self.cancel.load(Ordering::Relaxed) {
            self.finish(TerminationReason::StoppedExternally);
            return Ok(self.status);
        }
        self.state.set_elapsed(self.elapsed());
        if let Some(reason) = self.config.termination.reason(&self.state) {
            self.finish(reason);
            return Ok(self.status);
        }

        let generation = self.state.generation() + 1;
        if let Err(e) = self.advance(generation) {
            return Err(self.fail(e, generation));
        }

        self.state.set_elapsed(self.elapsed());
        match self.config.termination.reason(&self.state) {
            Some(reason) => self.finish(reason),
            None => self.status = SearchStatus::Running,
        }
        Ok(self.status)
    }

    /// Initializes if needed and steps until finished.
    #[instrument(skip(self), fields(seed = self.seed))]
    pub fn run(&mut self) -> Result<SearchResult<E::Phenotype, E::Genotype>> {
        if self.status == SearchStatus::Uninitialized {
            self.initialize()?;
        }
        info!(pipeline = self.pipeline.name(), "search running");
        while !self.status.is_finished() {
            self.step()?;
        }
        self.result()
            .ok_or_else(|| Error::State("search failed; no result available".into()))
    }

    /// The result of a finished, successful search.
    ///
    /// `None` while running and after a failure.
    pub fn result(&self) -> Option<SearchResult<E::Phenotype, E::Genotype>> {
        let reason = match self.status {
            SearchStatus::Finished(TerminationReason::Failed) => return None,
            SearchStatus::Finished(reason) => reason,
            _ => return None,
        };
        let best = self.state.best()?.clone();
        let evaluation = *best.evaluation()?;
        let phenotype = self.objective.decode(best.genotype()).ok()?;
        Some(SearchResult {
            phenotype,
            objective: evaluation.objective,
            fitness: evaluation.fitness,
            reason,
            summary: SearchSummary {
                reason,
                generations: self.state.generation(),
                evaluations: self.state.evaluations(),
                elapsed: self.state.elapsed(),
                best_fitness: evaluation.fitness,
                best_objective: evaluation.objective,
                direction: self.objective.direction(),
            },
            history: self.state.objective_history().to_vec(),
            snapshots: self.state.snapshots().to_vec(),
            best,
        })
    }

    /// Captures population, state, random generator and counters.
    pub fn checkpoint(&self) -> Result<Checkpoint<E::Genotype>> {
        if self.status == SearchStatus::Uninitialized {
            return Err(Error::State("nothing to checkpoint before initialize".into()));
        }
        Ok(Checkpoint {
            population: self.population.clone(),
            state: self.state.clone(),
            status: self.status,
            rng: self.rng.clone(),
            evaluations: self.objective.evaluations(),
            elapsed: self.elapsed(),
            seed: self.seed,
        })
    }

    /// Copies of the `n` best members, for migration.
    pub fn emigrants(&self, n: usize) -> Vec<Individual<E::Genotype>> {
        self.population
            .sorted_indices()
            .into_iter()
            .take(n)
            .map(|i| self.population.individuals()[i].clone())
            .collect()
    }

    /// Replaces the worst members by `immigrants` (evaluated individuals
    /// from another search on the same objective). Size is preserved;
    /// surplus immigrants are dropped.
    pub fn immigrate(&mut self, immigrants: Vec<Individual<E::Genotype>>) -> Result<()> {
        if self.status == SearchStatus::Uninitialized {
            return Err(Error::State("immigration before initialize".into()));
        }
        let order = self.population.sorted_indices();
        let k = immigrants.len().min(order.len());
        let slots: Vec<usize> = order.iter().rev().take(k).copied().collect();
        let immigrants: Vec<_> = immigrants.into_iter().take(k).collect();
        for ind in &immigrants {
            self.state.offer(ind);
        }
        self.population.replace(&slots, immigrants)
    }

    /// One generation; leaves `self.population` untouched on error.
    fn advance(&mut self, generation: usize) -> Result<()> {
        let progress = self.config.termination.progress(&self.state).unwrap_or(0.0);
        self.pipeline.update(progress);
        let mut offspring = self.breed(generation)?;

        let encoding = self.objective.encoding();
        offspring = offspring
            .into_iter()
            .map(|ind| {
                if ind.is_evaluated() {
                    ind
                } else {
                    ind.map_genotype(|g| encoding.repair(g))
                }
            })
            .collect();

        if let Some(cap) = self.config.termination.evaluation_cap() {
            let mut remaining = cap.saturating_sub(self.objective.evaluations());
            let mut keep = offspring.len();
            for (i, ind) in offspring.iter().enumerate() {
                if self.objective.needs_evaluation(ind) {
                    if remaining == 0 {
                        keep = i;
                        break;
                    }
                    remaining -= 1;
                }
            }
            if keep < offspring.len() {
                debug!(
                    kept = keep,
                    dropped = offspring.len() - keep,
                    "offspring trimmed to the evaluation budget"
                );
            }
            offspring.truncate(keep);
        }

        let pending: Vec<usize> = (0..offspring.len())
            .filter(|&i| self.objective.needs_evaluation(&offspring[i]))
            .collect();
        let evaluations = {
            let batch: Vec<&Individual<E::Genotype>> =
                pending.iter().map(|&i| &offspring[i]).collect();
            self.evaluate_batch(&batch)?
        };
        for (&i, e) in pending.iter().zip(evaluations) {
            offspring[i].set_evaluation(e);
        }

        let champion = offspring
            .iter()
            .filter(|i| i.is_evaluated())
            .reduce(|best, i| if i.is_better_than(best) { i } else { best })
            .cloned();
        let next = self
            .config
            .replacement
            .merge(&self.population, offspring, &mut self.rng, generation)?;
        debug_assert_eq!(next.size(), self.population.size());

        self.population = next;
        if let Some(champion) = champion {
            self.state.offer(&champion);
        }
        self.state.set_generation(generation);
        self.state.set_evaluations(self.objective.evaluations());
        self.state.set_elapsed(self.elapsed());
        self.state.record_best();
        self.publish();
        debug!(
            generation,
            evaluations = self.state.evaluations(),
            best = ?self.state.best_fitness(),
            "generation complete"
        );
        Ok(())
    }

    /// Selects parents and runs the pipeline until enough offspring exist.
    fn breed(&mut self, generation: usize) -> Result<Vec<Individual<E::Genotype>>> {
        let want = self.offspring_count;
        let (input, output) = self.pipeline.arity();
        let per_mating = match input {
            Arity::Fixed(k) => k,
            Arity::Any => self.population.size(),
        };
        let selection = self.config.selection;
        let population = &self.population;
        let pipeline = &self.pipeline;
        let mut ctx = OperatorContext {
            rng: &mut self.rng,
            population: population.individuals(),
            best: self.state.best(),
            initializer: self.initializer.as_ref(),
            generation,
        };

        let mut offspring = Vec::with_capacity(want);
        match output {
            Arity::Fixed(m) if m > 0 => {
                let matings = want.div_ceil(m);
                let mut parents = if per_mating == 0 {
                    Vec::new()
                } else {
                    selection.select(population, matings * per_mating, &mut *ctx.rng)?
                }
                .into_iter();
                for _ in 0..matings {
                    let group: Vec<_> = parents.by_ref().take(per_mating).collect();
                    offspring.extend(pipeline.apply(group, &mut ctx)?);
                }
            }
            _ => {
                for _ in 0..want {
                    if offspring.len() >= want {
                        break;
                    }
                    let group = if per_mating == 0 {
                        Vec::new()
                    } else {
                        selection.select(population, per_mating, &mut *ctx.rng)?
                    };
                    offspring.extend(pipeline.apply(group, &mut ctx)?);
                }
            }
        }

        if offspring.is_empty() {
            return Err(Error::Configuration(format!(
                "pipeline `{}` produced no offspring",
                pipeline.name()
            )));
        }
        offspring.truncate(want);
        Ok(offspring)
    }

    /// Evaluates a batch, on the worker pool when there is one. Results are
    /// in batch order; the first failure in that order is reported.
    /// Evaluates unevaluated individuals; one batch call per worker, results
    /// in dispatch order.
    fn evaluate_batch(&self, batch: &[&Individual<E::Genotype>]) -> Result<Vec<Evaluation>> {
        let objective = &self.objective;
        let genotypes: Vec<&E::Genotype> = batch.iter().map(|ind| ind.genotype()).collect();
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            let chunk = genotypes.len().div_ceil(pool.current_num_threads()).max(1);
            let results: Vec<Result<Vec<Evaluation>>> = pool.install(|| {
                genotypes
                    .par_chunks(chunk)
                    .map(|part| objective.evaluate_genotypes(part))
                    .collect()
            });
            let mut out = Vec::with_capacity(genotypes.len());
            for part in results {
                out.extend(part?);
            }
            return Ok(out);
        }
        objective.evaluate_genotypes(&genotypes)
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer(&snapshot);
        }
        if self.config.retain_history {
            self.state.push_snapshot(snapshot);
        }
    }

    fn finish(&mut self, reason: TerminationReason) {
        self.status = SearchStatus::Finished(reason);
        info!(
            generation = self.state.generation(),
            evaluations = self.state.evaluations(),
            best = ?self.state.best_objective(),
            %reason,
            "search finished"
        );
    }

    fn fail(&mut self, e: Error, generation: usize) -> Error {
        let e = e.at_generation(generation);
        error!(generation, error = %e, "search failed");
        self.status = SearchStatus::Finished(TerminationReason::Failed);
        e
    }
}
