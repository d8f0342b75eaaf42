//! The `pm` capability surface
//!
//! JavaScript source evaluated into each sandbox context before the user
//! script runs. It builds the complete API visible to scripts (the `pm`
//! object with environment access, response introspection, `pm.test`, and
//! `pm.expect`, plus a log-capturing `console`) from the raw `__vars` /
//! `__response` globals the bridge injects, and exposes a `__collect`
//! hook that serializes the accumulated outcome back to the host.
//!
//! The assertion builder mirrors the chai subset scripts expect: property
//! chains (`.to.be.true`) assert on getter access so a bare expression
//! statement can fail a test, and `.not` flips every check in the chain.

/// Prelude evaluated before each script. Expects `__vars` (object) and
/// optionally `__response` on the global object; publishes `__pm`,
/// `__console`, and `__collect`.
pub(crate) const PM_PRELUDE: &str = r#"
(function() {
  'use strict';

  const vars = Object.assign(Object.create(null), globalThis.__vars);
  const response = globalThis.__response;
  delete globalThis.__vars;
  delete globalThis.__response;

  const logs = [];
  const tests = [];

  // ---------------------------------------------------------------------
  // Rendering helpers
  // ---------------------------------------------------------------------

  function render(value) {
    if (value === undefined) return 'undefined';
    if (value === null) return 'null';
    if (typeof value === 'function') return '[Function]';
    if (typeof value === 'string') return JSON.stringify(value);
    if (typeof value === 'object') {
      try { return JSON.stringify(value); } catch (_) { return String(value); }
    }
    return String(value);
  }

  function renderLogArg(value) {
    if (typeof value === 'string') return value;
    return render(value);
  }

  function typeOf(value) {
    if (value === null) return 'null';
    if (Array.isArray(value)) return 'array';
    return typeof value;
  }

  function deepEqual(a, b) {
    if (a === b) return true;
    if (typeof a !== typeof b) return false;
    if (a === null || b === null) return false;
    if (typeof a === 'number') return a === b;
    if (Array.isArray(a)) {
      if (!Array.isArray(b) || a.length !== b.length) return false;
      for (let i = 0; i < a.length; i++) {
        if (!deepEqual(a[i], b[i])) return false;
      }
      return true;
    }
    if (typeof a === 'object') {
      if (Array.isArray(b)) return false;
      const keysA = Object.keys(a);
      const keysB = Object.keys(b);
      if (keysA.length !== keysB.length) return false;
      for (const key of keysA) {
        if (!Object.prototype.hasOwnProperty.call(b, key)) return false;
        if (!deepEqual(a[key], b[key])) return false;
      }
      return true;
    }
    return false;
  }

  // ---------------------------------------------------------------------
  // Assertion builder
  // ---------------------------------------------------------------------

  class Assertion {
    constructor(actual) {
      this._actual = actual;
      this._negated = false;
    }

    _assert(passed, message, negatedMessage) {
      if (this._negated ? passed : !passed) {
        throw new Error(this._negated ? negatedMessage : message);
      }
      return this;
    }
  }

  // Language chains: no-op getters that keep the fluent sentence readable
  for (const chain of ['to', 'be', 'been', 'is', 'that', 'which', 'and',
                       'has', 'have', 'with', 'at', 'of', 'same', 'deep']) {
    Object.defineProperty(Assertion.prototype, chain, {
      get() { return this; }
    });
  }

  Object.defineProperty(Assertion.prototype, 'not', {
    get() {
      this._negated = !this._negated;
      return this;
    }
  });

  // Flag assertions: checked on property access
  function defineFlag(name, check) {
    Object.defineProperty(Assertion.prototype, name, {
      get() {
        const outcome = check(this._actual);
        return this._assert(outcome.passed, outcome.message, outcome.negated);
      }
    });
  }

  defineFlag('true', (a) => ({
    passed: a === true,
    message: 'expected ' + render(a) + ' to be true',
    negated: 'expected ' + render(a) + ' to not be true',
  }));

  defineFlag('false', (a) => ({
    passed: a === false,
    message: 'expected ' + render(a) + ' to be false',
    negated: 'expected ' + render(a) + ' to not be false',
  }));

  defineFlag('null', (a) => ({
    passed: a === null,
    message: 'expected ' + render(a) + ' to be null',
    negated: 'expected ' + render(a) + ' to not be null',
  }));

  defineFlag('undefined', (a) => ({
    passed: a === undefined,
    message: 'expected ' + render(a) + ' to be undefined',
    negated: 'expected ' + render(a) + ' to not be undefined',
  }));

  defineFlag('ok', (a) => ({
    passed: !!a,
    message: 'expected ' + render(a) + ' to be truthy',
    negated: 'expected ' + render(a) + ' to not be truthy',
  }));

  defineFlag('exist', (a) => ({
    passed: a !== null && a !== undefined,
    message: 'expected ' + render(a) + ' to exist',
    negated: 'expected ' + render(a) + ' to not exist',
  }));

  defineFlag('empty', (a) => {
    let passed;
    if (typeof a === 'string' || Array.isArray(a)) {
      passed = a.length === 0;
    } else if (a !== null && typeof a === 'object') {
      passed = Object.keys(a).length === 0;
    } else {
      passed = false;
    }
    return {
      passed,
      message: 'expected ' + render(a) + ' to be empty',
      negated: 'expected ' + render(a) + ' to not be empty',
    };
  });

  Assertion.prototype.equal = function(expected) {
    return this._assert(this._actual === expected,
      'expected ' + render(this._actual) + ' to equal ' + render(expected),
      'expected ' + render(this._actual) + ' to not equal ' + render(expected));
  };
  Assertion.prototype.equals = Assertion.prototype.equal;
  Assertion.prototype.eq = Assertion.prototype.equal;

  Assertion.prototype.eql = function(expected) {
    return this._assert(deepEqual(this._actual, expected),
      'expected ' + render(this._actual) + ' to deeply equal ' + render(expected),
      'expected ' + render(this._actual) + ' to not deeply equal ' + render(expected));
  };
  Assertion.prototype.eqls = Assertion.prototype.eql;

  Assertion.prototype.a = function(typeName) {
    const expected = String(typeName).toLowerCase();
    const actualType = typeOf(this._actual);
    return this._assert(actualType === expected,
      'expected ' + render(this._actual) + ' to be a ' + expected + ' but got ' + actualType,
      'expected ' + render(this._actual) + ' to not be a ' + expected);
  };
  Assertion.prototype.an = Assertion.prototype.a;

  function defineComparison(names, compare, word) {
    for (const name of names) {
      Assertion.prototype[name] = function(n) {
        return this._assert(typeof this._actual === 'number' && compare(this._actual, n),
          'expected ' + render(this._actual) + ' to be ' + word + ' ' + render(n),
          'expected ' + render(this._actual) + ' to not be ' + word + ' ' + render(n));
      };
    }
  }

  defineComparison(['above', 'greaterThan', 'gt'], (a, n) => a > n, 'above');
  defineComparison(['below', 'lessThan', 'lt'], (a, n) => a < n, 'below');
  defineComparison(['least', 'gte'], (a, n) => a >= n, 'at least');
  defineComparison(['most', 'lte'], (a, n) => a <= n, 'at most');

  Assertion.prototype.property = function(name, value) {
    const target = this._actual;
    const key = String(name);
    const has = target !== null && target !== undefined
      && Object.prototype.hasOwnProperty.call(Object(target), key);

    if (arguments.length < 2) {
      return this._assert(has,
        'expected ' + render(target) + ' to have property ' + render(key),
        'expected ' + render(target) + ' to not have property ' + render(key));
    }

    const actualValue = has ? target[key] : undefined;
    return this._assert(has && deepEqual(actualValue, value),
      'expected ' + render(target) + ' to have property ' + render(key)
        + ' of ' + render(value) + ' but got ' + render(actualValue),
      'expected ' + render(target) + ' to not have property ' + render(key)
        + ' of ' + render(value));
  };

  Assertion.prototype.lengthOf = function(n) {
    const target = this._actual;
    const len = target === null || target === undefined ? undefined : target.length;
    return this._assert(len === n,
      'expected ' + render(target) + ' to have length ' + render(n) + ' but got ' + render(len),
      'expected ' + render(target) + ' to not have length ' + render(n));
  };
  Assertion.prototype.length = Assertion.prototype.lengthOf;

  Assertion.prototype.status = function(code) {
    const target = this._actual;
    let actualCode;
    if (target !== null && typeof target === 'object') {
      actualCode = typeof target.code === 'number' ? target.code : target.status;
    } else {
      actualCode = target;
    }
    return this._assert(actualCode === code,
      'expected response to have status ' + render(code) + ' but got ' + render(actualCode),
      'expected response to not have status ' + render(code));
  };

  Assertion.prototype.include = function(item) {
    const target = this._actual;
    let passed = false;

    if (typeof target === 'string') {
      passed = target.indexOf(String(item)) !== -1;
    } else if (Array.isArray(target)) {
      passed = target.some((member) => deepEqual(member, item));
    } else if (target !== null && typeof target === 'object'
               && item !== null && typeof item === 'object') {
      passed = Object.keys(item).every((key) =>
        Object.prototype.hasOwnProperty.call(target, key)
          && deepEqual(target[key], item[key]));
    }

    return this._assert(passed,
      'expected ' + render(target) + ' to include ' + render(item),
      'expected ' + render(target) + ' to not include ' + render(item));
  };
  Assertion.prototype.includes = Assertion.prototype.include;
  Assertion.prototype.contain = Assertion.prototype.include;
  Assertion.prototype.contains = Assertion.prototype.include;

  Assertion.prototype.match = function(pattern) {
    const re = pattern instanceof RegExp ? pattern : new RegExp(pattern);
    return this._assert(re.test(String(this._actual)),
      'expected ' + render(this._actual) + ' to match ' + String(re),
      'expected ' + render(this._actual) + ' to not match ' + String(re));
  };
  Assertion.prototype.matches = Assertion.prototype.match;

  // ---------------------------------------------------------------------
  // console
  // ---------------------------------------------------------------------

  function capture() {
    const parts = [];
    for (let i = 0; i < arguments.length; i++) {
      parts.push(renderLogArg(arguments[i]));
    }
    logs.push(parts.join(' '));
  }

  const sandboxConsole = Object.freeze({
    log: capture,
    info: capture,
    warn: capture,
    error: capture,
    debug: capture,
  });

  // ---------------------------------------------------------------------
  // pm
  // ---------------------------------------------------------------------

  const environment = Object.freeze({
    get(key) {
      return vars[String(key)];
    },
    set(key, value) {
      vars[String(key)] = String(value);
    },
    unset(key) {
      delete vars[String(key)];
    },
    has(key) {
      return vars[String(key)] !== undefined;
    },
  });

  let pmResponse;
  if (response !== undefined && response !== null) {
    pmResponse = {
      code: response.status,
      status: response.statusText,
      headers: response.headers,
      json() { return response.body; },
      text() {
        return typeof response.body === 'string'
          ? response.body
          : JSON.stringify(response.body);
      },
      metadata(key) {
        const map = response.metadata || {};
        return key === undefined ? map : map[String(key)];
      },
      trailers(key) {
        const map = response.trailers || {};
        return key === undefined ? map : map[String(key)];
      },
    };
    Object.defineProperty(pmResponse, 'grpcStatus', {
      get() { return response.grpcStatus; },
      enumerable: true,
    });
    Object.freeze(pmResponse);
  } else {
    const unavailable = function(name) {
      throw new Error('sandbox capability unavailable: pm.response.' + name
        + ' requires a response context (test scripts only)');
    };
    pmResponse = {
      code: undefined,
      status: undefined,
      headers: undefined,
      json() { unavailable('json()'); },
      text() { unavailable('text()'); },
      metadata() { unavailable('metadata()'); },
      trailers() { unavailable('trailers()'); },
    };
    Object.defineProperty(pmResponse, 'grpcStatus', {
      get() { unavailable('grpcStatus'); },
      enumerable: true,
    });
    Object.freeze(pmResponse);
  }

  function test(name, fn) {
    const testName = String(name);
    if (typeof fn !== 'function') {
      tests.push({ name: testName, passed: false,
                   error: 'pm.test requires a callback function' });
      return;
    }
    try {
      fn();
      tests.push({ name: testName, passed: true });
    } catch (e) {
      const message = e instanceof Error ? e.message : String(e);
      tests.push({ name: testName, passed: false, error: message });
    }
  }

  function expect(actual) {
    return new Assertion(actual);
  }

  const pm = Object.freeze({
    environment,
    response: pmResponse,
    test,
    expect,
  });

  globalThis.__pm = pm;
  globalThis.__console = sandboxConsole;
  globalThis.__collect = function() {
    return JSON.stringify({ variables: vars, tests, logs });
  };
})();
"#;
